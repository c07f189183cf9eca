//! Typed preference keys.
//!
//! Each persisted preference has exactly one [`Key`], which fixes both its
//! name in the store and the Rust type it is read as. Enum-valued settings
//! are stored as `i64` ordinals, lists as comma-joined strings.

use super::store::{PrefValue, PreferenceStore, StoreError};
use std::marker::PhantomData;

/// Conversion between a Rust type and its stored [`PrefValue`] shape.
pub trait PrefType: Sized {
    /// `None` when the stored value has a different shape.
    fn from_pref(value: &PrefValue) -> Option<Self>;
    fn into_pref(self) -> PrefValue;
}

impl PrefType for bool {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_pref(self) -> PrefValue {
        PrefValue::Bool(self)
    }
}

impl PrefType for i64 {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    fn into_pref(self) -> PrefValue {
        PrefValue::Int(self)
    }
}

impl PrefType for f32 {
    // Integers are accepted: TOML writes `1.0` but hand-edited files say `1`
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::Float(f) => Some(*f as f32),
            PrefValue::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    fn into_pref(self) -> PrefValue {
        PrefValue::Float(self as f64)
    }
}

impl PrefType for String {
    fn from_pref(value: &PrefValue) -> Option<Self> {
        match value {
            PrefValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_pref(self) -> PrefValue {
        PrefValue::String(self)
    }
}

#[derive(Debug)]
pub struct Key<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

// Manual impls: derive would require `T: Clone`
impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T: PrefType> Key<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The stored value, or `None` when absent or of the wrong shape.
    pub fn read(&self, store: &dyn PreferenceStore) -> Option<T> {
        store.get(self.name).as_ref().and_then(T::from_pref)
    }

    pub fn write(&self, store: &mut dyn PreferenceStore, value: T) -> Result<(), StoreError> {
        store.set(self.name, value.into_pref())
    }
}

pub const NIGHT_MODE: Key<i64> = Key::new("night_mode");
pub const DYNAMIC_COLORS: Key<bool> = Key::new("dynamic_colors");
pub const AMOLED_MODE: Key<bool> = Key::new("amoled_mode");
pub const APP_COLOR_TUPLE: Key<String> = Key::new("app_color_tuple");
pub const BORDER_WIDTH: Key<f32> = Key::new("border_width");
pub const PRESETS: Key<String> = Key::new("presets");
pub const FAB_ALIGNMENT: Key<i64> = Key::new("fab_alignment");
pub const SHOW_UPDATE_DIALOG: Key<bool> = Key::new("show_update_dialog_on_startup");
pub const SELECTED_EMOJI: Key<i64> = Key::new("selected_emoji");
pub const IMAGE_PICKER_MODE: Key<i64> = Key::new("image_picker_mode");
pub const CLEAR_CACHE_ON_LAUNCH: Key<bool> = Key::new("clear_cache_on_launch");
pub const GROUP_OPTIONS_BY_TYPES: Key<bool> = Key::new("group_options_by_types");
pub const SCREEN_LIST: Key<String> = Key::new("screen_list");
pub const ADD_SEQUENCE_NUMBER: Key<bool> = Key::new("add_sequence_number");
pub const SAVE_FOLDER: Key<String> = Key::new("save_folder");
pub const FILENAME_PREFIX: Key<String> = Key::new("filename_prefix");
pub const ADD_SIZE_IN_FILENAME: Key<bool> = Key::new("add_size_in_filename");
pub const ADD_ORIGINAL_FILENAME: Key<bool> = Key::new("add_original_filename");
pub const RANDOMIZE_FILENAME: Key<bool> = Key::new("randomize_filename");
pub const OVERWRITE_FILES: Key<bool> = Key::new("overwrite_files");
pub const FONT: Key<i64> = Key::new("font");
pub const FONT_SCALE: Key<f32> = Key::new("font_scale");
pub const ALLOW_BETAS: Key<bool> = Key::new("allow_betas");
pub const DRAW_CONTAINER_SHADOWS: Key<bool> = Key::new("draw_container_shadows");
pub const APP_OPEN_COUNT: Key<i64> = Key::new("app_open_count");
pub const LOCK_DRAW_ORIENTATION: Key<bool> = Key::new("lock_draw_orientation");
pub const DEFAULT_DRAW_MODE: Key<i64> = Key::new("default_draw_mode");
pub const KEEP_METADATA: Key<bool> = Key::new("keep_metadata");

/// Every key name, in settings-screen order.
pub const ALL: [&str; 28] = [
    NIGHT_MODE.name,
    DYNAMIC_COLORS.name,
    AMOLED_MODE.name,
    APP_COLOR_TUPLE.name,
    BORDER_WIDTH.name,
    PRESETS.name,
    FAB_ALIGNMENT.name,
    SHOW_UPDATE_DIALOG.name,
    SELECTED_EMOJI.name,
    IMAGE_PICKER_MODE.name,
    CLEAR_CACHE_ON_LAUNCH.name,
    GROUP_OPTIONS_BY_TYPES.name,
    SCREEN_LIST.name,
    ADD_SEQUENCE_NUMBER.name,
    SAVE_FOLDER.name,
    FILENAME_PREFIX.name,
    ADD_SIZE_IN_FILENAME.name,
    ADD_ORIGINAL_FILENAME.name,
    RANDOMIZE_FILENAME.name,
    OVERWRITE_FILES.name,
    FONT.name,
    FONT_SCALE.name,
    ALLOW_BETAS.name,
    DRAW_CONTAINER_SHADOWS.name,
    APP_OPEN_COUNT.name,
    LOCK_DRAW_ORIENTATION.name,
    DEFAULT_DRAW_MODE.name,
    KEEP_METADATA.name,
];

/// Join a list of numbers for storage under a string key.
pub fn join_list(values: &[u32]) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Inverse of [`join_list`]. `None` if any element is not a number.
pub fn split_list(raw: &str) -> Option<Vec<u32>> {
    if raw.trim().is_empty() {
        return Some(Vec::new());
    }
    raw.split(',').map(|s| s.trim().parse().ok()).collect()
}
