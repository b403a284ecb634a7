pub mod virtual_machine;

pub use virtual_machine::VirtualMachineResource;
