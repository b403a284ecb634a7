//! `azurestack_virtual_machine`
//!
//! `admin_password` and `custom_data` are never returned by the API; Read
//! carries them over from the prior state. Deleting the machine optionally
//! removes its disks afterwards, managed disks through ARM and unmanaged VHDs
//! through the blob service.

use async_trait::async_trait;
use base64::prelude::*;
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::resource::{
    CreateResourceRequest, CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceWithImportState, UpdateResourceRequest,
    UpdateResourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, BlockBuilder, NestedBlock, Schema, SchemaBuilder};
use tfplug::validator::{NumberRangeValidator, StringLengthValidator};
use tfplug::DynamicValue;

use crate::api::common::SubResource;
use crate::api::compute::{
    DataDisk, HardwareProfile, ImageReference, LinuxConfiguration, ManagedDiskParameters,
    NetworkInterfaceReference, NetworkInterfaceReferenceProperties, NetworkProfile, OsDisk,
    OsProfile, SshConfiguration, SshPublicKey, StorageProfile, VirtualHardDisk, VirtualMachine,
    VirtualMachineProperties, WindowsConfiguration,
};
use crate::api::{ignore_not_found, ApiError};
use crate::config::Timeouts;
use crate::error::ProviderError;
use crate::ids::{
    prefer_spelling, AvailabilitySetId, BlobId, IdValidator, ManagedDiskId, NetworkInterfaceId,
    ResourceId, VirtualMachineId,
};
use crate::provider_data::AzureStackProviderData;
use crate::resources::common::{
    created, decode, decode_state, deleted, encode, ensure_absent, id_attribute, import_id, name_attribute,
    prefer_case, read_back, resource_group_name_attribute, state_id, updated,
};
use crate::{location, tags};

const TYPE_NAME: &str = "azurestack_virtual_machine";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VirtualMachineModel {
    pub id: Option<String>,
    pub name: String,
    pub location: String,
    pub resource_group_name: String,
    pub vm_size: String,
    pub network_interface_ids: Vec<String>,
    pub primary_network_interface_id: Option<String>,
    pub availability_set_id: Option<String>,
    pub license_type: Option<String>,
    pub storage_image_reference: Vec<ImageReferenceBlock>,
    pub storage_os_disk: Vec<OsDiskBlock>,
    pub storage_data_disk: Vec<DataDiskBlock>,
    pub os_profile: Vec<OsProfileBlock>,
    pub os_profile_linux_config: Vec<LinuxConfigBlock>,
    pub os_profile_windows_config: Vec<WindowsConfigBlock>,
    pub delete_os_disk_on_termination: bool,
    pub delete_data_disks_on_termination: bool,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageReferenceBlock {
    pub id: Option<String>,
    pub publisher: Option<String>,
    pub offer: Option<String>,
    pub sku: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsDiskBlock {
    pub name: String,
    pub create_option: String,
    pub caching: Option<String>,
    pub os_type: Option<String>,
    pub vhd_uri: Option<String>,
    pub managed_disk_type: Option<String>,
    pub managed_disk_id: Option<String>,
    pub disk_size_gb: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDiskBlock {
    pub name: String,
    pub create_option: String,
    pub lun: i64,
    pub caching: Option<String>,
    pub vhd_uri: Option<String>,
    pub managed_disk_type: Option<String>,
    pub managed_disk_id: Option<String>,
    pub disk_size_gb: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsProfileBlock {
    pub computer_name: String,
    pub admin_username: String,
    pub admin_password: Option<String>,
    pub custom_data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinuxConfigBlock {
    pub disable_password_authentication: bool,
    pub ssh_keys: Vec<SshKeyBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshKeyBlock {
    pub path: String,
    pub key_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowsConfigBlock {
    pub provision_vm_agent: bool,
    pub enable_automatic_upgrades: bool,
    pub timezone: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

fn managed_disk(disk_type: &Option<String>, disk_id: &Option<String>) -> Option<ManagedDiskParameters> {
    let storage_account_type = non_empty(disk_type);
    let id = non_empty(disk_id);
    if storage_account_type.is_none() && id.is_none() {
        return None;
    }
    Some(ManagedDiskParameters {
        id,
        storage_account_type,
    })
}

fn check_disk_source(
    disk: &str,
    vhd_uri: &Option<String>,
    disk_type: &Option<String>,
    disk_id: &Option<String>,
) -> Result<(), ProviderError> {
    if non_empty(vhd_uri).is_some() && managed_disk(disk_type, disk_id).is_some() {
        return Err(ProviderError::validation(
            TYPE_NAME,
            format!(
                "disk {:?}: vhd_uri cannot be combined with managed_disk_type or managed_disk_id",
                disk
            ),
        ));
    }
    Ok(())
}

pub fn expand_os_disk(disk: &OsDiskBlock) -> Result<OsDisk, ProviderError> {
    check_disk_source(&disk.name, &disk.vhd_uri, &disk.managed_disk_type, &disk.managed_disk_id)?;
    Ok(OsDisk {
        os_type: non_empty(&disk.os_type),
        name: Some(disk.name.clone()),
        vhd: non_empty(&disk.vhd_uri).map(|uri| VirtualHardDisk { uri: Some(uri) }),
        caching: non_empty(&disk.caching),
        create_option: Some(disk.create_option.clone()),
        disk_size_gb: disk.disk_size_gb.filter(|size| *size > 0),
        managed_disk: managed_disk(&disk.managed_disk_type, &disk.managed_disk_id),
    })
}

pub fn expand_data_disks(disks: &[DataDiskBlock]) -> Result<Vec<DataDisk>, ProviderError> {
    disks
        .iter()
        .map(|disk| {
            check_disk_source(&disk.name, &disk.vhd_uri, &disk.managed_disk_type, &disk.managed_disk_id)?;
            Ok(DataDisk {
                lun: disk.lun,
                name: Some(disk.name.clone()),
                vhd: non_empty(&disk.vhd_uri).map(|uri| VirtualHardDisk { uri: Some(uri) }),
                caching: non_empty(&disk.caching),
                create_option: Some(disk.create_option.clone()),
                disk_size_gb: disk.disk_size_gb.filter(|size| *size > 0),
                managed_disk: managed_disk(&disk.managed_disk_type, &disk.managed_disk_id),
            })
        })
        .collect()
}

/// Without an explicit primary the first interface is marked primary when
/// the machine has more than one
pub fn expand_network_profile(model: &VirtualMachineModel) -> Result<NetworkProfile, ProviderError> {
    let ids = model
        .network_interface_ids
        .iter()
        .map(|id| NetworkInterfaceId::parse(id))
        .collect::<Result<Vec<_>, _>>()?;
    let primary = match model.primary_network_interface_id.as_deref().filter(|p| !p.is_empty()) {
        Some(primary) => {
            let primary = NetworkInterfaceId::parse(primary)?;
            match ids.iter().position(|id| *id == primary) {
                Some(idx) => Some(idx),
                None => {
                    return Err(ProviderError::validation(
                        TYPE_NAME,
                        format!(
                            "primary_network_interface_id {:?} is not one of network_interface_ids",
                            primary.id()
                        ),
                    ))
                }
            }
        }
        None if ids.len() > 1 => Some(0),
        None => None,
    };

    let network_interfaces = model
        .network_interface_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| NetworkInterfaceReference {
            id: Some(id.clone()),
            properties: primary.map(|p| NetworkInterfaceReferenceProperties {
                primary: Some(p == idx),
            }),
        })
        .collect();
    Ok(NetworkProfile {
        network_interfaces: Some(network_interfaces),
    })
}

pub fn expand_os_profile(model: &VirtualMachineModel) -> Result<Option<OsProfile>, ProviderError> {
    if !model.os_profile_linux_config.is_empty() && !model.os_profile_windows_config.is_empty() {
        return Err(ProviderError::validation(
            TYPE_NAME,
            "only one of os_profile_linux_config and os_profile_windows_config can be set",
        ));
    }
    let Some(profile) = model.os_profile.first() else {
        return Ok(None);
    };

    let linux_configuration = model.os_profile_linux_config.first().map(|linux| LinuxConfiguration {
        disable_password_authentication: Some(linux.disable_password_authentication),
        ssh: (!linux.ssh_keys.is_empty()).then(|| SshConfiguration {
            public_keys: Some(
                linux
                    .ssh_keys
                    .iter()
                    .map(|key| SshPublicKey {
                        path: Some(key.path.clone()),
                        key_data: Some(key.key_data.clone()),
                    })
                    .collect(),
            ),
        }),
    });
    let windows_configuration = model
        .os_profile_windows_config
        .first()
        .map(|windows| WindowsConfiguration {
            provision_vm_agent: Some(windows.provision_vm_agent),
            enable_automatic_updates: Some(windows.enable_automatic_upgrades),
            time_zone: non_empty(&windows.timezone),
        });

    Ok(Some(OsProfile {
        computer_name: Some(profile.computer_name.clone()),
        admin_username: Some(profile.admin_username.clone()),
        admin_password: non_empty(&profile.admin_password),
        custom_data: non_empty(&profile.custom_data).map(|data| BASE64_STANDARD.encode(data)),
        linux_configuration,
        windows_configuration,
    }))
}

pub fn expand(model: &VirtualMachineModel) -> Result<VirtualMachine, ProviderError> {
    let Some(os_disk) = model.storage_os_disk.first() else {
        return Err(ProviderError::validation(TYPE_NAME, "storage_os_disk is required"));
    };
    if os_disk.create_option.eq_ignore_ascii_case("FromImage") && model.os_profile.is_empty() {
        return Err(ProviderError::validation(
            TYPE_NAME,
            "os_profile is required when storage_os_disk.create_option is FromImage",
        ));
    }
    let availability_set = match model.availability_set_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => Some(SubResource::new(AvailabilitySetId::parse(id)?.id())),
        None => None,
    };
    let image_reference = model.storage_image_reference.first().map(|image| ImageReference {
        id: non_empty(&image.id),
        publisher: non_empty(&image.publisher),
        offer: non_empty(&image.offer),
        sku: non_empty(&image.sku),
        version: non_empty(&image.version),
    });

    Ok(VirtualMachine {
        location: Some(location::normalize(&model.location)),
        tags: Some(tags::expand(Some(&model.tags))),
        properties: VirtualMachineProperties {
            hardware_profile: Some(HardwareProfile {
                vm_size: Some(model.vm_size.clone()),
            }),
            storage_profile: Some(StorageProfile {
                image_reference,
                os_disk: Some(expand_os_disk(os_disk)?),
                data_disks: Some(expand_data_disks(&model.storage_data_disk)?),
            }),
            os_profile: expand_os_profile(model)?,
            network_profile: Some(expand_network_profile(model)?),
            availability_set,
            license_type: non_empty(&model.license_type),
            ..Default::default()
        },
        ..Default::default()
    })
}

/// The configured spelling of an ARM ID when it names the same resource
fn known_id<T: ResourceId + PartialEq>(known: Option<&str>, actual: Option<&str>) -> Option<String> {
    let actual = actual?;
    match T::parse(actual) {
        Ok(parsed) => Some(prefer_spelling(known, &parsed)),
        Err(_) => Some(actual.to_string()),
    }
}

pub fn flatten_os_disk(disk: Option<&OsDisk>, known: Option<&OsDiskBlock>) -> Vec<OsDiskBlock> {
    let Some(disk) = disk else {
        return Vec::new();
    };
    let managed = disk.managed_disk.as_ref();
    vec![OsDiskBlock {
        name: disk.name.clone().unwrap_or_default(),
        create_option: prefer_case(known.map(|k| k.create_option.as_str()), disk.create_option.clone())
            .unwrap_or_default(),
        caching: prefer_case(known.and_then(|k| k.caching.as_deref()), disk.caching.clone()),
        os_type: prefer_case(known.and_then(|k| k.os_type.as_deref()), disk.os_type.clone()),
        vhd_uri: disk.vhd.as_ref().and_then(|v| v.uri.clone()),
        managed_disk_type: prefer_case(
            known.and_then(|k| k.managed_disk_type.as_deref()),
            managed.and_then(|m| m.storage_account_type.clone()),
        ),
        managed_disk_id: known_id::<ManagedDiskId>(
            known.and_then(|k| k.managed_disk_id.as_deref()),
            managed.and_then(|m| m.id.as_deref()),
        ),
        disk_size_gb: disk.disk_size_gb,
    }]
}

/// Data disks are matched to the configuration by LUN
pub fn flatten_data_disks(disks: Option<&Vec<DataDisk>>, known: &[DataDiskBlock]) -> Vec<DataDiskBlock> {
    let Some(disks) = disks else {
        return Vec::new();
    };
    disks
        .iter()
        .map(|disk| {
            let k = known.iter().find(|k| k.lun == disk.lun);
            let managed = disk.managed_disk.as_ref();
            DataDiskBlock {
                name: disk.name.clone().unwrap_or_default(),
                create_option: prefer_case(k.map(|k| k.create_option.as_str()), disk.create_option.clone())
                    .unwrap_or_default(),
                lun: disk.lun,
                caching: prefer_case(k.and_then(|k| k.caching.as_deref()), disk.caching.clone()),
                vhd_uri: disk.vhd.as_ref().and_then(|v| v.uri.clone()),
                managed_disk_type: prefer_case(
                    k.and_then(|k| k.managed_disk_type.as_deref()),
                    managed.and_then(|m| m.storage_account_type.clone()),
                ),
                managed_disk_id: known_id::<ManagedDiskId>(
                    k.and_then(|k| k.managed_disk_id.as_deref()),
                    managed.and_then(|m| m.id.as_deref()),
                ),
                disk_size_gb: disk.disk_size_gb,
            }
        })
        .collect()
}

pub fn flatten_network_interfaces(
    profile: Option<&NetworkProfile>,
    known: &VirtualMachineModel,
) -> (Vec<String>, Option<String>) {
    let refs = profile
        .and_then(|p| p.network_interfaces.as_deref())
        .unwrap_or_default();
    let mut ids = Vec::with_capacity(refs.len());
    let mut primary = None;
    for nic in refs {
        let Some(actual) = nic.id.as_deref() else {
            continue;
        };
        let spelled = match NetworkInterfaceId::parse(actual) {
            Ok(parsed) => {
                let configured = known
                    .network_interface_ids
                    .iter()
                    .find(|k| NetworkInterfaceId::parse(k).is_ok_and(|k| k == parsed));
                prefer_spelling(configured.map(String::as_str), &parsed)
            }
            Err(_) => actual.to_string(),
        };
        if nic.properties.as_ref().and_then(|p| p.primary).unwrap_or(false) {
            primary = Some(spelled.clone());
        }
        ids.push(spelled);
    }

    // only reported when configured, the API marks a primary on its own
    let primary = known
        .primary_network_interface_id
        .as_ref()
        .and_then(|_| primary);
    (ids, primary)
}

pub fn flatten_os_profile(
    profile: Option<&OsProfile>,
    known: &VirtualMachineModel,
) -> (Vec<OsProfileBlock>, Vec<LinuxConfigBlock>, Vec<WindowsConfigBlock>) {
    let Some(profile) = profile else {
        return (Vec::new(), Vec::new(), Vec::new());
    };
    let known_profile = known.os_profile.first();
    let os_profile = vec![OsProfileBlock {
        computer_name: profile.computer_name.clone().unwrap_or_default(),
        admin_username: profile.admin_username.clone().unwrap_or_default(),
        admin_password: known_profile.and_then(|p| p.admin_password.clone()),
        custom_data: known_profile.and_then(|p| p.custom_data.clone()),
    }];

    let linux = profile
        .linux_configuration
        .as_ref()
        .map(|linux| LinuxConfigBlock {
            disable_password_authentication: linux.disable_password_authentication.unwrap_or_default(),
            ssh_keys: linux
                .ssh
                .as_ref()
                .and_then(|ssh| ssh.public_keys.as_ref())
                .map(|keys| {
                    keys.iter()
                        .map(|key| SshKeyBlock {
                            path: key.path.clone().unwrap_or_default(),
                            key_data: key.key_data.clone().unwrap_or_default(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        })
        .into_iter()
        .collect();
    let windows = profile
        .windows_configuration
        .as_ref()
        .map(|windows| WindowsConfigBlock {
            provision_vm_agent: windows.provision_vm_agent.unwrap_or_default(),
            enable_automatic_upgrades: windows.enable_automatic_updates.unwrap_or_default(),
            timezone: windows.time_zone.clone(),
        })
        .into_iter()
        .collect();
    (os_profile, linux, windows)
}

pub fn flatten(id: &VirtualMachineId, vm: &VirtualMachine, known: &VirtualMachineModel) -> VirtualMachineModel {
    let props = &vm.properties;
    let storage = props.storage_profile.as_ref();
    let (network_interface_ids, primary_network_interface_id) =
        flatten_network_interfaces(props.network_profile.as_ref(), known);
    let (os_profile, os_profile_linux_config, os_profile_windows_config) =
        flatten_os_profile(props.os_profile.as_ref(), known);

    VirtualMachineModel {
        id: Some(id.id()),
        name: id.name.clone(),
        location: vm.location.as_deref().map(location::normalize).unwrap_or_default(),
        resource_group_name: id.resource_group.clone(),
        vm_size: prefer_case(
            Some(known.vm_size.as_str()),
            props.hardware_profile.as_ref().and_then(|h| h.vm_size.clone()),
        )
        .unwrap_or_default(),
        network_interface_ids,
        primary_network_interface_id,
        availability_set_id: known_id::<AvailabilitySetId>(
            known.availability_set_id.as_deref(),
            props.availability_set.as_ref().and_then(|a| a.id.as_deref()),
        ),
        license_type: props.license_type.clone(),
        storage_image_reference: storage
            .and_then(|s| s.image_reference.as_ref())
            .map(|image| ImageReferenceBlock {
                id: image.id.clone(),
                publisher: image.publisher.clone(),
                offer: image.offer.clone(),
                sku: image.sku.clone(),
                version: image.version.clone(),
            })
            .into_iter()
            .collect(),
        storage_os_disk: flatten_os_disk(
            storage.and_then(|s| s.os_disk.as_ref()),
            known.storage_os_disk.first(),
        ),
        storage_data_disk: flatten_data_disks(
            storage.and_then(|s| s.data_disks.as_ref()),
            &known.storage_data_disk,
        ),
        os_profile,
        os_profile_linux_config,
        os_profile_windows_config,
        delete_os_disk_on_termination: known.delete_os_disk_on_termination,
        delete_data_disks_on_termination: known.delete_data_disks_on_termination,
        tags: tags::flatten(vm.tags.as_ref()),
    }
}

/// A disk left behind by a deleted machine
#[derive(Debug, Clone, PartialEq)]
pub enum DiskRef {
    Managed(ManagedDiskId),
    Vhd(BlobId),
}

impl DiskRef {
    fn from_parts(vhd_uri: Option<&str>, managed_id: Option<&str>) -> Option<Result<DiskRef, ProviderError>> {
        if let Some(id) = managed_id.filter(|id| !id.is_empty()) {
            return Some(ManagedDiskId::parse(id).map(DiskRef::Managed).map_err(Into::into));
        }
        vhd_uri
            .filter(|uri| !uri.is_empty())
            .map(|uri| BlobId::parse(uri).map(DiskRef::Vhd).map_err(Into::into))
    }
}

/// The disks to remove after the machine itself is gone
pub fn disks_to_delete(
    storage: Option<&StorageProfile>,
    delete_os_disk: bool,
    delete_data_disks: bool,
) -> Result<Vec<DiskRef>, ProviderError> {
    let Some(storage) = storage else {
        return Ok(Vec::new());
    };
    let mut disks = Vec::new();
    if delete_os_disk {
        if let Some(disk) = storage.os_disk.as_ref() {
            let managed = disk.managed_disk.as_ref().and_then(|m| m.id.as_deref());
            let vhd = disk.vhd.as_ref().and_then(|v| v.uri.as_deref());
            disks.extend(DiskRef::from_parts(vhd, managed).transpose()?);
        }
    }
    if delete_data_disks {
        for disk in storage.data_disks.iter().flatten() {
            let managed = disk.managed_disk.as_ref().and_then(|m| m.id.as_deref());
            let vhd = disk.vhd.as_ref().and_then(|v| v.uri.as_deref());
            disks.extend(DiskRef::from_parts(vhd, managed).transpose()?);
        }
    }
    Ok(disks)
}

pub struct VirtualMachineResource {
    provider_data: AzureStackProviderData,
    timeouts: Timeouts,
}

impl VirtualMachineResource {
    pub fn new(provider_data: AzureStackProviderData) -> Self {
        Self {
            provider_data,
            timeouts: Timeouts::virtual_machine(),
        }
    }

    fn string(name: &str, description: &str) -> AttributeBuilder {
        AttributeBuilder::new(name, AttributeType::String).description(description)
    }

    fn disk_attributes(block: BlockBuilder) -> BlockBuilder {
        block
            .attribute(
                Self::string("name", "The name of the disk")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                Self::string("create_option", "How the disk is created: FromImage, Empty or Attach")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                Self::string("caching", "Caching requirements of the disk")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                Self::string("managed_disk_type", "Storage account type of a managed disk")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                Self::string("managed_disk_id", "ID of an existing managed disk to attach")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("disk_size_gb", AttributeType::Number)
                    .description("Size of the disk in gigabytes")
                    .optional()
                    .computed()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: Some(4095.0),
                    })
                    .build(),
            )
    }

    pub fn schema_static() -> Schema {
        let image_reference = BlockBuilder::new()
            .attribute(Self::string("id", "ID of a custom image").optional().build())
            .attribute(Self::string("publisher", "Image publisher").optional().build())
            .attribute(Self::string("offer", "Image offer").optional().build())
            .attribute(Self::string("sku", "Image SKU").optional().build())
            .attribute(
                Self::string("version", "Image version")
                    .optional()
                    .computed()
                    .build(),
            )
            .build();

        let os_disk = Self::disk_attributes(BlockBuilder::new())
            .attribute(
                Self::string("os_type", "Operating system of the disk, Linux or Windows")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                Self::string("vhd_uri", "Blob URL of an unmanaged VHD")
                    .optional()
                    .force_new()
                    .build(),
            )
            .build();

        let data_disk = Self::disk_attributes(BlockBuilder::new())
            .attribute(
                AttributeBuilder::new("lun", AttributeType::Number)
                    .description("Logical unit number of the disk")
                    .required()
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: Some(63.0),
                    })
                    .build(),
            )
            .attribute(Self::string("vhd_uri", "Blob URL of an unmanaged VHD").optional().build())
            .build();

        let os_profile = BlockBuilder::new()
            .attribute(
                Self::string("computer_name", "Host name of the machine")
                    .required()
                    .force_new()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                Self::string("admin_username", "Name of the administrator account")
                    .required()
                    .force_new()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                Self::string("admin_password", "Password of the administrator account")
                    .optional()
                    .sensitive()
                    .build(),
            )
            .attribute(
                Self::string("custom_data", "Data passed to the machine on first boot")
                    .optional()
                    .sensitive()
                    .force_new()
                    .build(),
            )
            .build();

        let ssh_key = BlockBuilder::new()
            .attribute(Self::string("path", "Where the key is written on the machine").required().build())
            .attribute(Self::string("key_data", "The public key").required().build())
            .build();
        let linux_config = BlockBuilder::new()
            .attribute(
                AttributeBuilder::new("disable_password_authentication", AttributeType::Bool)
                    .description("Only allow key based logins")
                    .required()
                    .build(),
            )
            .block(NestedBlock::list("ssh_keys", ssh_key))
            .build();

        let windows_config = BlockBuilder::new()
            .attribute(
                AttributeBuilder::new("provision_vm_agent", AttributeType::Bool)
                    .description("Install the VM agent")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enable_automatic_upgrades", AttributeType::Bool)
                    .description("Apply Windows updates automatically")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                Self::string("timezone", "Time zone of the machine")
                    .optional()
                    .force_new()
                    .build(),
            )
            .build();

        SchemaBuilder::new()
            .version(0)
            .description("Manages a virtual machine")
            .attribute(id_attribute())
            .attribute(name_attribute("The name of the virtual machine"))
            .attribute(location::schema())
            .attribute(resource_group_name_attribute())
            .attribute(
                Self::string("vm_size", "The size of the virtual machine")
                    .required()
                    .validator(StringLengthValidator::not_empty())
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("network_interface_ids", AttributeType::list_of(AttributeType::String))
                    .description("IDs of the network interfaces attached to the machine")
                    .required()
                    .build(),
            )
            .attribute(
                Self::string("primary_network_interface_id", "Which of network_interface_ids is primary")
                    .optional()
                    .validator(IdValidator::<NetworkInterfaceId>::new())
                    .build(),
            )
            .attribute(
                Self::string("availability_set_id", "ID of the availability set to place the machine in")
                    .optional()
                    .force_new()
                    .validator(IdValidator::<AvailabilitySetId>::new())
                    .build(),
            )
            .attribute(Self::string("license_type", "Windows license type").optional().build())
            .attribute(
                AttributeBuilder::new("delete_os_disk_on_termination", AttributeType::Bool)
                    .description("Remove the OS disk when the machine is deleted")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("delete_data_disks_on_termination", AttributeType::Bool)
                    .description("Remove data disks when the machine is deleted")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .build(),
            )
            .attribute(tags::schema())
            .block(
                NestedBlock::list("storage_image_reference", image_reference)
                    .max_items(1)
                    .force_new(),
            )
            .block(
                NestedBlock::list("storage_os_disk", os_disk)
                    .min_items(1)
                    .max_items(1),
            )
            .block(NestedBlock::list("storage_data_disk", data_disk))
            .block(NestedBlock::list("os_profile", os_profile).max_items(1))
            .block(NestedBlock::list("os_profile_linux_config", linux_config).max_items(1))
            .block(NestedBlock::list("os_profile_windows_config", windows_config).max_items(1))
            .build()
    }

    async fn create_vm(&self, ctx: &Context, model: &VirtualMachineModel) -> Result<String, ProviderError> {
        let vm = expand(model)?;
        let compute = self.provider_data.client.compute();
        let id = VirtualMachineId::new(
            self.provider_data.client.subscription_id(),
            &model.resource_group_name,
            &model.name,
        );

        let existing = compute.get_virtual_machine(ctx, &id).await;
        ensure_absent(existing, TYPE_NAME, &id.id(), &model.name, &model.resource_group_name)?;

        tracing::info!("Creating virtual machine {}", id);
        compute
            .create_or_update_virtual_machine(ctx, &id, &vm)
            .await
            .map_err(|e| {
                ProviderError::upstream(TYPE_NAME, "creating", &model.name, &model.resource_group_name, e)
            })?;
        Ok(id.id())
    }

    async fn read_vm(
        &self,
        ctx: &Context,
        id: &str,
        known: &VirtualMachineModel,
    ) -> Result<Option<DynamicValue>, ProviderError> {
        let id = VirtualMachineId::parse(id)?;
        match self.provider_data.client.compute().get_virtual_machine(ctx, &id).await {
            Ok(vm) => Ok(Some(encode(TYPE_NAME, &flatten(&id, &vm, known))?)),
            Err(e) if e.is_not_found() => {
                tracing::warn!("Virtual machine {} was not found, removing from state", id);
                Ok(None)
            }
            Err(e) => Err(ProviderError::upstream(TYPE_NAME, "reading", &id.name, &id.resource_group, e)),
        }
    }

    async fn update_vm(
        &self,
        ctx: &Context,
        prior: &VirtualMachineModel,
        planned: &VirtualMachineModel,
    ) -> Result<String, ProviderError> {
        let desired = expand(planned)?;
        let id = VirtualMachineId::parse(prior.id.as_deref().unwrap_or_default())?;
        let compute = self.provider_data.client.compute();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let mut vm = compute
            .get_virtual_machine(ctx, &id)
            .await
            .map_err(|e| upstream("retrieving", e))?;
        let desired = desired.properties;

        if planned.tags != prior.tags {
            vm.tags = Some(tags::expand(Some(&planned.tags)));
        }
        if planned.vm_size != prior.vm_size {
            vm.properties.hardware_profile = desired.hardware_profile;
        }
        if planned.license_type != prior.license_type {
            vm.properties.license_type = desired.license_type;
        }
        if planned.network_interface_ids != prior.network_interface_ids
            || planned.primary_network_interface_id != prior.primary_network_interface_id
        {
            vm.properties.network_profile = desired.network_profile;
        }
        if planned.storage_os_disk != prior.storage_os_disk || planned.storage_data_disk != prior.storage_data_disk {
            let wanted = desired.storage_profile.unwrap_or_default();
            let storage = vm.properties.storage_profile.get_or_insert_with(Default::default);
            if let (Some(current), Some(wanted)) = (storage.os_disk.as_mut(), wanted.os_disk) {
                current.caching = wanted.caching.or(current.caching.take());
                current.disk_size_gb = wanted.disk_size_gb.or(current.disk_size_gb);
            }
            storage.data_disks = wanted.data_disks;
        }
        if planned.os_profile_linux_config != prior.os_profile_linux_config
            || planned.os_profile_windows_config != prior.os_profile_windows_config
        {
            if let (Some(current), Some(wanted)) = (vm.properties.os_profile.as_mut(), desired.os_profile) {
                current.linux_configuration = wanted.linux_configuration;
                current.windows_configuration = wanted.windows_configuration;
            }
        }
        if let Some(profile) = vm.properties.os_profile.as_mut() {
            profile.admin_password = None;
            profile.custom_data = None;
        }
        vm.properties.provisioning_state = None;
        vm.properties.vm_id = None;
        vm.properties.extra.remove("instanceView");
        vm.extra.remove("resources");

        tracing::info!("Updating virtual machine {}", id);
        compute
            .create_or_update_virtual_machine(ctx, &id, &vm)
            .await
            .map_err(|e| upstream("updating", e))?;
        Ok(id.id())
    }

    async fn delete_disk(&self, ctx: &Context, vm: &VirtualMachineId, disk: DiskRef) -> Result<(), ProviderError> {
        let upstream = |e: ApiError| {
            ProviderError::upstream(TYPE_NAME, "deleting disks of", &vm.name, &vm.resource_group, e)
        };
        match disk {
            DiskRef::Managed(id) => {
                tracing::info!("Deleting managed disk {}", id);
                ignore_not_found(self.provider_data.client.compute().delete_managed_disk(ctx, &id).await)
                    .map_err(upstream)
            }
            DiskRef::Vhd(id) => {
                tracing::info!("Deleting VHD {}", id);
                let blobs = match self
                    .provider_data
                    .client
                    .storage()
                    .blob_client(ctx, &id.account_name)
                    .await
                {
                    Ok(blobs) => blobs,
                    Err(e) if e.is_not_found() => return Ok(()),
                    Err(e) => return Err(upstream(e)),
                };
                ignore_not_found(blobs.delete(ctx, &id).await).map_err(upstream)
            }
        }
    }

    async fn delete_vm(&self, ctx: &Context, prior: &DynamicValue) -> Result<(), ProviderError> {
        let id = VirtualMachineId::parse(&state_id(TYPE_NAME, prior)?)?;
        let known: VirtualMachineModel = decode_state(TYPE_NAME, prior)?;
        let compute = self.provider_data.client.compute();
        let upstream = |action: &'static str, e: ApiError| {
            ProviderError::upstream(TYPE_NAME, action, &id.name, &id.resource_group, e)
        };

        let vm = match compute.get_virtual_machine(ctx, &id).await {
            Ok(vm) => vm,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => return Err(upstream("retrieving", e)),
        };
        let disks = disks_to_delete(
            vm.properties.storage_profile.as_ref(),
            known.delete_os_disk_on_termination,
            known.delete_data_disks_on_termination,
        )?;

        tracing::info!("Deleting virtual machine {}", id);
        ignore_not_found(compute.delete_virtual_machine(ctx, &id).await)
            .map_err(|e| upstream("deleting", e))?;

        let deletions: Vec<BoxFuture<'_, Result<(), ProviderError>>> = disks
            .into_iter()
            .map(|disk| self.delete_disk(ctx, &id, disk).boxed())
            .collect();
        future::try_join_all(deletions).await?;
        Ok(())
    }
}

#[async_trait]
impl Resource for VirtualMachineResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.create);
        let model: VirtualMachineModel = match decode(TYPE_NAME, &request.planned_state) {
            Ok(model) => model,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let id = match self.create_vm(&ctx, &model).await {
            Ok(id) => id,
            Err(e) => return CreateResourceResponse::failed(request.planned_state, e.into()),
        };
        let read = self.read_vm(&ctx, &id, &model).await;
        created(TYPE_NAME, request.planned_state, id, read)
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.read);
        let prior = decode_state::<VirtualMachineModel>(TYPE_NAME, &request.current_state)
            .and_then(|known| state_id(TYPE_NAME, &request.current_state).map(|id| (id, known)));
        let read = match prior {
            Ok((id, known)) => self.read_vm(&ctx, &id, &known).await,
            Err(e) => Err(e),
        };
        read_back(request.current_state, read)
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.update);
        let models = decode::<VirtualMachineModel>(TYPE_NAME, &request.prior_state).and_then(|prior| {
            decode::<VirtualMachineModel>(TYPE_NAME, &request.planned_state).map(|planned| (prior, planned))
        });
        let (prior, planned) = match models {
            Ok(models) => models,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let id = match self.update_vm(&ctx, &prior, &planned).await {
            Ok(id) => id,
            Err(e) => return UpdateResourceResponse::failed(request.prior_state, e.into()),
        };
        let read = self.read_vm(&ctx, &id, &planned).await;
        updated(TYPE_NAME, request.planned_state, id, read)
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let ctx = ctx.with_timeout(self.timeouts.delete);
        deleted(self.delete_vm(&ctx, &request.prior_state).await)
    }
}

#[async_trait]
impl ResourceWithImportState for VirtualMachineResource {
    async fn import_state(
        &self,
        _ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        import_id::<VirtualMachineId>(&request)
    }
}
