//! Contest bounds

/// Fewest templates a battle may offer
pub const MIN_TEMPLATES: u8 = 2;

/// Most templates a battle may offer
pub const MAX_TEMPLATES: u8 = 10;

pub const MIN_CAPTIONS: u16 = 2;

pub const MAX_CAPTIONS: u16 = 256;

/// Shortest allowed battle (1 minute)
pub const MIN_BATTLE_DURATION: u64 = 60;

/// Longest allowed battle (7 days)
pub const MAX_BATTLE_DURATION: u64 = 604_800;
