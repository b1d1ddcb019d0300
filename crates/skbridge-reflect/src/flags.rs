use bitflags::bitflags;

bitflags! {
    /// Calling flags on a host function
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u32 {
        /// Cannot be overridden further
        const FINAL              = 0x0000_0001;
        /// Implemented by a native entry point
        const NATIVE             = 0x0000_0400;
        /// Event that the host side implements
        const EVENT              = 0x0000_0800;
        /// No receiver object
        const STATIC             = 0x0000_2000;
        const PUBLIC             = 0x0002_0000;
        const HAS_OUT_PARMS      = 0x0040_0000;
        /// Graph nodes may call this function
        const BLUEPRINT_CALLABLE = 0x0400_0000;
        /// Graphs may implement this function
        const BLUEPRINT_EVENT    = 0x0800_0000;
    }
}

bitflags! {
    /// Flags on a function property
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u64 {
        const BLUEPRINT_VISIBLE = 0x0000_0004;
        const PARM              = 0x0000_0080;
        const OUT_PARM          = 0x0000_0100;
        const RETURN_PARM       = 0x0000_0400;
        const REFERENCE_PARM    = 0x0800_0000;
    }
}
