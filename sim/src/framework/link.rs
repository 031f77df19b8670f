use crate::isa::BitField;

/// Index of a component in its circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ComponentId(pub(crate) usize);

/// Index of a link in its circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub(crate) usize);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for ComponentId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// A 32-bit signal endpoint owned by one component.
///
/// An input has at most one source; an output fans out to any number of
/// sinks. Only the owner writes the value (inputs are refreshed by the
/// circuit when it pulls from the sources).
#[derive(Debug, Clone)]
pub struct Link {
    pub(crate) owner: ComponentId,
    pub(crate) slot: u8,
    pub(crate) direction: Direction,
    pub(crate) value: u32,
    /// bits of the stored value visible to the owner (inputs only)
    pub(crate) field: Option<BitField>,
    pub(crate) source: Option<LinkId>,
    pub(crate) sinks: Vec<LinkId>,
    /// activity of an unconnected input
    pub(crate) active: bool,
}

impl Link {
    pub(crate) fn new(
        owner: ComponentId,
        slot: u8,
        direction: Direction,
        field: Option<BitField>,
    ) -> Self {
        Self {
            owner,
            slot,
            direction,
            value: 0,
            field,
            source: None,
            sinks: Vec::new(),
            active: false,
        }
    }

    /// Value as seen by the owner: inputs apply their bit field.
    pub fn value(&self) -> u32 {
        match (self.direction, self.field) {
            (Direction::Input, Some(field)) => field.extract(self.value),
            _ => self.value,
        }
    }

    pub fn raw_value(&self) -> u32 {
        self.value
    }

    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_input(&self) -> bool {
        self.direction == Direction::Input
    }

    pub fn field(&self) -> Option<BitField> {
        self.field
    }

    pub fn source(&self) -> Option<LinkId> {
        self.source
    }

    pub fn sinks(&self) -> &[LinkId] {
        &self.sinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_read() {
        let mut link = Link::new(
            ComponentId(0),
            2,
            Direction::Input,
            Some(BitField::new(21, 5)),
        );
        link.value = 0x8c41_fffc;
        assert_eq!(link.value(), 2);
        assert_eq!(link.raw_value(), 0x8c41_fffc);

        let mut out = Link::new(ComponentId(0), 3, Direction::Output, None);
        out.value = 0x8c41_fffc;
        assert_eq!(out.value(), 0x8c41_fffc);
    }
}
