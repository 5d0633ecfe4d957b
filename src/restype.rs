#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// The kind of container: an icon (ICO) file or a cursor (CUR) file.
pub enum ResourceType {
    /// Plain images (ICO files); directory X/Y hold planes and bit depth
    Icon,
    /// Images with cursor hotspots (CUR files); directory X/Y hold the
    /// hotspot
    Cursor,
}

impl ResourceType {
    /// Returns the resource type for the given header type code, if valid.
    pub fn from_number(number: u16) -> Option<ResourceType> {
        match number {
            1 => Some(ResourceType::Icon),
            2 => Some(ResourceType::Cursor),
            _ => None,
        }
    }

    /// Returns the type code stored in the file header.
    pub fn number(&self) -> u16 {
        match *self {
            ResourceType::Icon => 1,
            ResourceType::Cursor => 2,
        }
    }
}

//===========================================================================//


//===========================================================================//
