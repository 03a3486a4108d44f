use bytemuck::{Pod, Zeroable};

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
        pub struct $name(pub u32);

        impl $name {
            /// The null handle. Never names a live resource.
            pub const INVALID: Self = Self(0);

            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl From<u32> for $name {
            fn from(v: u32) -> Self {
                Self(v)
            }
        }
    };
}

define_handle!(
    /// Texture or texture view.
    TextureHandle
);
define_handle!(
    /// Vertex, index, uniform, shader storage or indirect buffer.
    BufferHandle
);
define_handle!(ProgramHandle);
define_handle!(
    /// Set of texture and uniform-buffer bindings applied with one `bind` call.
    BindGroupHandle
);

const _: () = assert!(core::mem::size_of::<TextureHandle>() == 4);
const _: () = assert!(core::mem::size_of::<BindGroupHandle>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_invalid() {
        assert!(!TextureHandle::INVALID.is_valid());
        assert!(!BufferHandle::default().is_valid());
        assert!(ProgramHandle(7).is_valid());
        assert_eq!(BindGroupHandle::from(3), BindGroupHandle(3));
    }

    #[test]
    fn handle_slices_cast_to_bytes() {
        let handles = [TextureHandle(1), TextureHandle(0x0102_0304)];
        let bytes: &[u8] = bytemuck::cast_slice(&handles);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[4..], &0x0102_0304u32.to_ne_bytes());
    }
}
