use core::fmt;

/// Generational handle to an entity in the [`World`](super::World).
///
/// A handle whose generation no longer matches its slot fails the liveness
/// check instead of aliasing whatever entity reused the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityHandle {
    index: u32,
    generation: u32,
}

impl EntityHandle {
    /// Handle that never refers to a live entity.
    pub const NULL: Self = Self {
        index: u32::MAX,
        generation: 0,
    };

    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.index == u32::MAX
    }

    /// Stable 64-bit key used for tie-breaking and hashing.
    pub const fn to_bits(self) -> u64 {
        ((self.index as u64) << 32) | self.generation as u64
    }
}

impl Default for EntityHandle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "#null")
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Attribute identifier, interned through the attribute name table.
    AttributeId(u16),
    "attr:"
);
id_type!(
    /// Gameplay tag identifier, interned through the tag name table.
    TagId(u16),
    "tag:"
);
id_type!(
    /// Effect template identifier.
    TemplateId(u32),
    "tmpl:"
);
id_type!(
    /// Registered graph program identifier.
    ProgramId(u32),
    "prog:"
);
id_type!(
    /// Response-chain correlation key. Zero means "assign on publish".
    RootId(u64),
    "root:"
);
id_type!(
    /// Key into a config/caller parameter table.
    ParamKey(u16),
    "param:"
);
id_type!(
    /// Native builtin handler identifier.
    BuiltinId(u16),
    "builtin:"
);
id_type!(
    /// Preset type selecting default phase handlers for a template.
    PresetType(u16),
    "preset:"
);
id_type!(
    /// Player (or AI seat) that answers prompts.
    PlayerId(u32),
    "player:"
);
id_type!(
    /// Live effect instance identifier, unique within a world.
    EffectInstanceId(u32),
    "fx:"
);
id_type!(
    /// Key into an entity blackboard.
    BlackboardKey(u16),
    "bb:"
);
id_type!(
    /// Tag carried by published gameplay events.
    EventTag(u16),
    "event:"
);

impl AttributeId {
    /// Horizontal force requested by force-applying effects.
    pub const FORCE_REQUEST_X: Self = Self(0);
    /// Vertical force requested by force-applying effects.
    pub const FORCE_REQUEST_Y: Self = Self(1);
}

impl RootId {
    pub const NONE: Self = Self(0);

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl PlayerId {
    /// Seat used for prompts raised by entities without a player.
    pub const AI: Self = Self(u32::MAX);
}

impl EventTag {
    pub const ATTRIBUTE_CHANGED: Self = Self(1);
    pub const TAG_ADDED: Self = Self(2);
    pub const TAG_REMOVED: Self = Self(3);
    pub const EFFECT_APPLIED: Self = Self(4);
    pub const EFFECT_REMOVED: Self = Self(5);
}

/// Ids that can be allocated densely by a [`NameTable`](crate::registry::NameTable).
pub trait DenseId: Copy + Eq {
    /// Number of distinct ids the type can represent.
    const LIMIT: usize;

    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

impl DenseId for AttributeId {
    const LIMIT: usize = u16::MAX as usize + 1;

    fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl DenseId for TagId {
    const LIMIT: usize = u16::MAX as usize + 1;

    fn from_index(index: usize) -> Self {
        Self(index as u16)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Planar position used by spatial queries.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Unit vector pointing at `radians` (0 = +x, counter-clockwise).
    pub fn from_angle(radians: f32) -> Vec2 {
        Vec2::new(radians.cos(), radians.sin())
    }
}
