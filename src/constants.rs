//! Application-wide constants
//!
//! Storage keys, format versions and gesture tuning live here so every
//! module agrees on the same literals.

/// Key-value storage keys
pub mod storage {
    /// Current multi-preset blob
    pub const PRESETS_KEY: &str = "prompt_chain_presets_v2";

    /// Legacy single-preset prompts blob (read once, then removed)
    pub const LEGACY_PROMPTS_KEY: &str = "prompt_chain_prompts";

    /// Legacy single-preset order blob (read once, then removed)
    pub const LEGACY_ORDER_KEY: &str = "prompt_chain_mixed_order";

    /// File extension used by the file-backed store
    pub const FILE_EXTENSION: &str = "json";
}

/// Preset naming
pub mod preset {
    /// Name of the preset synthesized from seed data or legacy storage
    pub const DEFAULT_PRESET_NAME: &str = "Default";
}

/// Section export/import format markers
pub mod transfer {
    /// Single-section export written by this crate
    pub const SECTION_VERSION: &str = "v2.1_section";

    /// Older whole-manager export
    pub const MANAGER_VERSION: &str = "v2.1";
}

/// Repair engine limits
pub mod migration {
    /// Upper bound on repair passes; the built-in rules converge in two
    pub const MAX_PASSES: usize = 8;
}

/// Drag gesture defaults (overridable via config)
pub mod drag {
    /// Pointer travel in either axis before a press becomes a drag
    pub const THRESHOLD_PX: f32 = 5.0;

    /// Distance from the viewport edge that triggers auto-scroll
    pub const AUTOSCROLL_MARGIN_PX: f32 = 40.0;

    /// Auto-scroll timer period
    pub const AUTOSCROLL_INTERVAL_MS: u64 = 16;

    /// Scroll offset change per timer tick
    pub const AUTOSCROLL_STEP_PX: f32 = 12.0;
}

/// Config file location
pub mod config {
    /// Directory under the platform config dir
    pub const APP_DIR: &str = "prompt-chain";

    /// Config file name
    pub const FILENAME: &str = "config.toml";

    /// Default storage subdirectory
    pub const STORAGE_DIR: &str = "storage";
}
