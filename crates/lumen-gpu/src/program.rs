use crate::types::{AttributeFlags, AttributeType, PrimitiveType, ShaderType, StateFlags};

pub const MAX_ATTRIBUTES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub components_count: u8,
    pub byte_offset: u8,
    pub ty: AttributeType,
    pub flags: AttributeFlags,
}

/// Vertex input layout of a program.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexDecl {
    pub primitive_type: PrimitiveType,
    pub attributes: Vec<Attribute>,
}

impl VertexDecl {
    pub fn new(primitive_type: PrimitiveType) -> Self {
        Self {
            primitive_type,
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    ///
    /// # Panics
    ///
    /// Panics if the declaration already holds [`MAX_ATTRIBUTES`] attributes.
    pub fn add_attribute(
        &mut self,
        byte_offset: u8,
        components_count: u8,
        ty: AttributeType,
        flags: AttributeFlags,
    ) -> &mut Self {
        assert!(
            self.attributes.len() < MAX_ATTRIBUTES,
            "vertex declaration is limited to {MAX_ATTRIBUTES} attributes"
        );
        self.attributes.push(Attribute {
            components_count,
            byte_offset,
            ty,
            flags,
        });
        self
    }

    pub fn stride(&self) -> u32 {
        self.attributes
            .iter()
            .filter(|a| !a.flags.contains(AttributeFlags::INSTANCED))
            .map(|a| u32::from(a.components_count) * a.ty.size_bytes())
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderType,
    pub code: String,
}

/// Everything a backend needs to build a program.
///
/// `prefixes` are prepended (one per line) to every stage's source by the
/// backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramDesc {
    pub state: StateFlags,
    pub decl: VertexDecl,
    pub sources: Vec<ShaderSource>,
    pub prefixes: Vec<String>,
    pub name: String,
}

impl ProgramDesc {
    pub fn is_compute(&self) -> bool {
        self.sources.iter().any(|s| s.stage == ShaderType::Compute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_skips_instanced_attributes() {
        let mut decl = VertexDecl::new(PrimitiveType::Triangles);
        decl.add_attribute(0, 3, AttributeType::Float, AttributeFlags::empty())
            .add_attribute(12, 4, AttributeType::U8, AttributeFlags::NORMALIZED)
            .add_attribute(0, 4, AttributeType::Float, AttributeFlags::INSTANCED);
        assert_eq!(decl.stride(), 16);
    }

    #[test]
    #[should_panic(expected = "limited to 16 attributes")]
    fn attribute_limit() {
        let mut decl = VertexDecl::default();
        for i in 0..=MAX_ATTRIBUTES {
            decl.add_attribute(i as u8, 1, AttributeType::U8, AttributeFlags::empty());
        }
    }
}
