resource_group_child_id!(
    VirtualMachineId,
    "Virtual Machine",
    "Microsoft.Compute",
    "virtualMachines"
);
resource_group_child_id!(ManagedDiskId, "Managed Disk", "Microsoft.Compute", "disks");
resource_group_child_id!(
    AvailabilitySetId,
    "Availability Set",
    "Microsoft.Compute",
    "availabilitySets"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ResourceId;

    #[test]
    fn virtual_machine_id_parses_any_casing() {
        let id = VirtualMachineId::parse(
            "/subscriptions/12345/resourcegroups/group1/providers/microsoft.compute/VIRTUALMACHINES/vm1",
        )
        .unwrap();
        assert_eq!(id, VirtualMachineId::new("12345", "group1", "vm1"));
    }

    #[test]
    fn managed_disk_id_is_not_a_virtual_machine_id() {
        let disk = ManagedDiskId::new("12345", "group1", "osdisk").id();
        assert!(VirtualMachineId::parse(&disk).is_err());
        assert_eq!(ManagedDiskId::parse(&disk).unwrap().name, "osdisk");
    }
}
