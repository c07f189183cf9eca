//! User preferences: one immutable snapshot, kept in sync with a store.
//!
//! [`SettingsState`] is a flat record of every preference with fully
//! enumerated defaults. [`SettingsRepository`] owns the
//! [`PreferenceStore`](store::PreferenceStore) and the current snapshot:
//!
//! - `state()` hands out the last-loaded `Arc<SettingsState>`; it never blocks
//!   on the store and never exposes a half-applied change.
//! - Every update method writes exactly one key, then reloads the whole
//!   snapshot from the store and broadcasts it to subscribers.
//! - Missing keys and values of the wrong shape fall back to the default.
//!   Enum preferences are stored as ordinals; unknown ordinals map to the
//!   enum's default without an error.

pub mod keys;
pub mod store;

use crate::draw::DrawMode;
use crate::naming::FilenamePolicy;
use keys::{Key, PrefType, join_list, split_list};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use store::{PreferenceStore, StoreError};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown setting {0:?}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
}

/// Enums persisted by ordinal, with a name for CLI input and display.
macro_rules! ordinal_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident default $default:ident {
            $($variant:ident = $ordinal:literal => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[doc = $label]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Total: unknown ordinals map to the default.
            pub fn from_ordinal(ordinal: i32) -> Self {
                match ordinal {
                    $($ordinal => $name::$variant,)+
                    _ => $name::$default,
                }
            }

            pub fn ordinal(self) -> i32 {
                match self {
                    $($name::$variant => $ordinal,)+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = ();

            /// Accepts a name or an ordinal.
            fn from_str(s: &str) -> Result<Self, ()> {
                let s = s.trim();
                if let Ok(ordinal) = s.parse::<i32>() {
                    return Ok(Self::from_ordinal(ordinal));
                }
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name().eq_ignore_ascii_case(s))
                    .ok_or(())
            }
        }
    };
}

ordinal_enum! {
    pub enum NightMode default System {
        Light = 0 => "light",
        Dark = 1 => "dark",
        System = 2 => "system",
    }
}

ordinal_enum! {
    pub enum Alignment default End {
        Start = 0 => "start",
        Center = 1 => "center",
        End = 2 => "end",
    }
}

ordinal_enum! {
    pub enum ImagePickerMode default PhotoPicker {
        PhotoPicker = 0 => "photo_picker",
        Gallery = 1 => "gallery",
        GetContent = 2 => "get_content",
    }
}

ordinal_enum! {
    pub enum FontFam default System {
        System = 0 => "system",
        Montserrat = 1 => "montserrat",
        Caveat = 2 => "caveat",
        Comfortaa = 3 => "comfortaa",
        Handjet = 4 => "handjet",
        Jura = 5 => "jura",
        Podkova = 6 => "podkova",
        Tektur = 7 => "tektur",
        YsabeauSC = 8 => "ysabeau_sc",
        DejaVu = 9 => "dejavu",
        BadScript = 10 => "bad_script",
        RubikBubbles = 11 => "rubik_bubbles",
    }
}

/// Default preset list: 100, 90, ..., 10 percent.
pub fn default_presets() -> Vec<u32> {
    (1..=10).rev().map(|p| p * 10).collect()
}

/// Immutable snapshot of every user preference.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsState {
    pub night_mode: NightMode,
    pub dynamic_colors: bool,
    pub amoled_mode: bool,
    pub app_color_tuple: String,
    pub border_width: f32,
    pub presets: Vec<u32>,
    pub fab_alignment: Alignment,
    pub show_update_dialog_on_startup: bool,
    pub selected_emoji: Option<u32>,
    pub image_picker_mode: ImagePickerMode,
    pub clear_cache_on_launch: bool,
    pub group_options_by_types: bool,
    /// Persisted tool order as screen ids. Empty means registry order.
    pub screen_list: Vec<u32>,
    pub add_sequence_number: bool,
    pub save_folder: Option<String>,
    pub filename_prefix: String,
    pub add_size_in_filename: bool,
    pub add_original_filename: bool,
    pub randomize_filename: bool,
    pub overwrite_files: bool,
    pub font: FontFam,
    pub font_scale: f32,
    pub allow_betas: bool,
    pub draw_container_shadows: bool,
    pub app_open_count: u32,
    pub lock_draw_orientation: bool,
    pub default_draw_mode: DrawMode,
    pub keep_metadata: bool,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            night_mode: NightMode::System,
            dynamic_colors: true,
            amoled_mode: false,
            app_color_tuple: String::new(),
            border_width: 1.0,
            presets: default_presets(),
            fab_alignment: Alignment::End,
            show_update_dialog_on_startup: true,
            selected_emoji: Some(0),
            image_picker_mode: ImagePickerMode::PhotoPicker,
            clear_cache_on_launch: false,
            group_options_by_types: true,
            screen_list: Vec::new(),
            add_sequence_number: true,
            save_folder: None,
            filename_prefix: "ResizedImage".to_string(),
            add_size_in_filename: false,
            add_original_filename: false,
            randomize_filename: false,
            overwrite_files: false,
            font: FontFam::System,
            font_scale: 1.0,
            allow_betas: true,
            draw_container_shadows: true,
            app_open_count: 0,
            lock_draw_orientation: true,
            default_draw_mode: DrawMode::Pen,
            keep_metadata: true,
        }
    }
}

/// Read an ordinal key. Absent, mistyped and out-of-range values become -1,
/// which every `from_ordinal` maps to its default.
fn read_ordinal(store: &dyn PreferenceStore, key: Key<i64>) -> i32 {
    key.read(store)
        .and_then(|v| i32::try_from(v).ok())
        .unwrap_or(-1)
}

impl SettingsState {
    /// Build a snapshot from the store, falling back per key.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let d = Self::default();
        Self {
            night_mode: NightMode::from_ordinal(read_ordinal(store, keys::NIGHT_MODE)),
            dynamic_colors: keys::DYNAMIC_COLORS.read(store).unwrap_or(d.dynamic_colors),
            amoled_mode: keys::AMOLED_MODE.read(store).unwrap_or(d.amoled_mode),
            app_color_tuple: keys::APP_COLOR_TUPLE.read(store).unwrap_or(d.app_color_tuple),
            border_width: keys::BORDER_WIDTH
                .read(store)
                .filter(|w| w.is_finite())
                .unwrap_or(d.border_width),
            presets: keys::PRESETS
                .read(store)
                .and_then(|raw| split_list(&raw))
                .filter(|p| !p.is_empty())
                .unwrap_or(d.presets),
            fab_alignment: Alignment::from_ordinal(read_ordinal(store, keys::FAB_ALIGNMENT)),
            show_update_dialog_on_startup: keys::SHOW_UPDATE_DIALOG
                .read(store)
                .unwrap_or(d.show_update_dialog_on_startup),
            // -1 is the stored spelling of "no emoji"
            selected_emoji: match keys::SELECTED_EMOJI.read(store) {
                Some(-1) => None,
                Some(v) => u32::try_from(v).ok().or(d.selected_emoji),
                None => d.selected_emoji,
            },
            image_picker_mode: ImagePickerMode::from_ordinal(read_ordinal(
                store,
                keys::IMAGE_PICKER_MODE,
            )),
            clear_cache_on_launch: keys::CLEAR_CACHE_ON_LAUNCH
                .read(store)
                .unwrap_or(d.clear_cache_on_launch),
            group_options_by_types: keys::GROUP_OPTIONS_BY_TYPES
                .read(store)
                .unwrap_or(d.group_options_by_types),
            screen_list: keys::SCREEN_LIST
                .read(store)
                .and_then(|raw| split_list(&raw))
                .unwrap_or(d.screen_list),
            add_sequence_number: keys::ADD_SEQUENCE_NUMBER
                .read(store)
                .unwrap_or(d.add_sequence_number),
            save_folder: keys::SAVE_FOLDER.read(store).filter(|f| !f.is_empty()),
            filename_prefix: keys::FILENAME_PREFIX.read(store).unwrap_or(d.filename_prefix),
            add_size_in_filename: keys::ADD_SIZE_IN_FILENAME
                .read(store)
                .unwrap_or(d.add_size_in_filename),
            add_original_filename: keys::ADD_ORIGINAL_FILENAME
                .read(store)
                .unwrap_or(d.add_original_filename),
            randomize_filename: keys::RANDOMIZE_FILENAME
                .read(store)
                .unwrap_or(d.randomize_filename),
            overwrite_files: keys::OVERWRITE_FILES.read(store).unwrap_or(d.overwrite_files),
            font: FontFam::from_ordinal(read_ordinal(store, keys::FONT)),
            font_scale: keys::FONT_SCALE
                .read(store)
                .filter(|s| s.is_finite() && *s > 0.0)
                .unwrap_or(d.font_scale),
            allow_betas: keys::ALLOW_BETAS.read(store).unwrap_or(d.allow_betas),
            draw_container_shadows: keys::DRAW_CONTAINER_SHADOWS
                .read(store)
                .unwrap_or(d.draw_container_shadows),
            app_open_count: keys::APP_OPEN_COUNT
                .read(store)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(d.app_open_count),
            lock_draw_orientation: keys::LOCK_DRAW_ORIENTATION
                .read(store)
                .unwrap_or(d.lock_draw_orientation),
            default_draw_mode: DrawMode::from_ordinal(read_ordinal(store, keys::DEFAULT_DRAW_MODE)),
            keep_metadata: keys::KEEP_METADATA.read(store).unwrap_or(d.keep_metadata),
        }
    }

    pub fn filename_policy(&self) -> FilenamePolicy {
        FilenamePolicy {
            prefix: self.filename_prefix.clone(),
            add_sequence_number: self.add_sequence_number,
            add_original_filename: self.add_original_filename,
            add_size_in_filename: self.add_size_in_filename,
            randomize: self.randomize_filename,
            overwrite: self.overwrite_files,
        }
    }

    /// `(key, value)` pairs in key order, values as the CLI accepts them back.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let emoji = self
            .selected_emoji
            .map_or_else(|| "none".to_string(), |e| e.to_string());
        vec![
            (keys::NIGHT_MODE.name(), self.night_mode.to_string()),
            (keys::DYNAMIC_COLORS.name(), self.dynamic_colors.to_string()),
            (keys::AMOLED_MODE.name(), self.amoled_mode.to_string()),
            (keys::APP_COLOR_TUPLE.name(), self.app_color_tuple.clone()),
            (keys::BORDER_WIDTH.name(), self.border_width.to_string()),
            (keys::PRESETS.name(), join_list(&self.presets)),
            (keys::FAB_ALIGNMENT.name(), self.fab_alignment.to_string()),
            (
                keys::SHOW_UPDATE_DIALOG.name(),
                self.show_update_dialog_on_startup.to_string(),
            ),
            (keys::SELECTED_EMOJI.name(), emoji),
            (keys::IMAGE_PICKER_MODE.name(), self.image_picker_mode.to_string()),
            (
                keys::CLEAR_CACHE_ON_LAUNCH.name(),
                self.clear_cache_on_launch.to_string(),
            ),
            (
                keys::GROUP_OPTIONS_BY_TYPES.name(),
                self.group_options_by_types.to_string(),
            ),
            (keys::SCREEN_LIST.name(), join_list(&self.screen_list)),
            (keys::ADD_SEQUENCE_NUMBER.name(), self.add_sequence_number.to_string()),
            (
                keys::SAVE_FOLDER.name(),
                self.save_folder.clone().unwrap_or_default(),
            ),
            (keys::FILENAME_PREFIX.name(), self.filename_prefix.clone()),
            (keys::ADD_SIZE_IN_FILENAME.name(), self.add_size_in_filename.to_string()),
            (
                keys::ADD_ORIGINAL_FILENAME.name(),
                self.add_original_filename.to_string(),
            ),
            (keys::RANDOMIZE_FILENAME.name(), self.randomize_filename.to_string()),
            (keys::OVERWRITE_FILES.name(), self.overwrite_files.to_string()),
            (keys::FONT.name(), self.font.to_string()),
            (keys::FONT_SCALE.name(), self.font_scale.to_string()),
            (keys::ALLOW_BETAS.name(), self.allow_betas.to_string()),
            (
                keys::DRAW_CONTAINER_SHADOWS.name(),
                self.draw_container_shadows.to_string(),
            ),
            (keys::APP_OPEN_COUNT.name(), self.app_open_count.to_string()),
            (
                keys::LOCK_DRAW_ORIENTATION.name(),
                self.lock_draw_orientation.to_string(),
            ),
            (keys::DEFAULT_DRAW_MODE.name(), self.default_draw_mode.to_string()),
            (keys::KEEP_METADATA.name(), self.keep_metadata.to_string()),
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries()
            .into_iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value)
    }
}

/// Owner of the preference store and the current snapshot.
pub struct SettingsRepository<S: PreferenceStore> {
    store: S,
    state: Arc<SettingsState>,
    subscribers: Vec<Sender<Arc<SettingsState>>>,
}

impl<S: PreferenceStore> SettingsRepository<S> {
    pub fn open(mut store: S) -> Result<Self, SettingsError> {
        store.refresh()?;
        let state = Arc::new(SettingsState::load(&store));
        Ok(Self {
            store,
            state,
            subscribers: Vec::new(),
        })
    }

    /// The last-loaded snapshot.
    pub fn state(&self) -> Arc<SettingsState> {
        Arc::clone(&self.state)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Receive every snapshot loaded from now on.
    pub fn subscribe(&mut self) -> Receiver<Arc<SettingsState>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Re-read the store and publish a fresh snapshot.
    pub fn reload(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        self.store.refresh()?;
        let state = Arc::new(SettingsState::load(&self.store));
        self.state = Arc::clone(&state);
        // Dropped receivers unsubscribe themselves
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&state)).is_ok());
        debug!(subscribers = self.subscribers.len(), "settings reloaded");
        Ok(state)
    }

    fn write<T: PrefType>(&mut self, key: Key<T>, value: T) -> Result<Arc<SettingsState>, SettingsError> {
        key.write(&mut self.store, value)?;
        self.reload()
    }

    fn write_ordinal(&mut self, key: Key<i64>, ordinal: i32) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(key, i64::from(ordinal))
    }

    pub fn set_night_mode(&mut self, mode: NightMode) -> Result<Arc<SettingsState>, SettingsError> {
        self.write_ordinal(keys::NIGHT_MODE, mode.ordinal())
    }

    pub fn toggle_dynamic_colors(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.dynamic_colors;
        self.write(keys::DYNAMIC_COLORS, value)
    }

    pub fn toggle_amoled_mode(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.amoled_mode;
        self.write(keys::AMOLED_MODE, value)
    }

    pub fn set_app_color_tuple(&mut self, tuple: &str) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::APP_COLOR_TUPLE, tuple.to_string())
    }

    pub fn set_border_width(&mut self, width: f32) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::BORDER_WIDTH, width)
    }

    pub fn set_presets(&mut self, presets: &[u32]) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::PRESETS, join_list(presets))
    }

    pub fn set_fab_alignment(&mut self, alignment: Alignment) -> Result<Arc<SettingsState>, SettingsError> {
        self.write_ordinal(keys::FAB_ALIGNMENT, alignment.ordinal())
    }

    pub fn toggle_show_update_dialog(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.show_update_dialog_on_startup;
        self.write(keys::SHOW_UPDATE_DIALOG, value)
    }

    pub fn set_emoji(&mut self, emoji: Option<u32>) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::SELECTED_EMOJI, emoji.map_or(-1, i64::from))
    }

    pub fn set_image_picker_mode(
        &mut self,
        mode: ImagePickerMode,
    ) -> Result<Arc<SettingsState>, SettingsError> {
        self.write_ordinal(keys::IMAGE_PICKER_MODE, mode.ordinal())
    }

    pub fn toggle_clear_cache_on_launch(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.clear_cache_on_launch;
        self.write(keys::CLEAR_CACHE_ON_LAUNCH, value)
    }

    pub fn toggle_group_options_by_types(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.group_options_by_types;
        self.write(keys::GROUP_OPTIONS_BY_TYPES, value)
    }

    pub fn set_screen_order(&mut self, ids: &[u32]) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::SCREEN_LIST, join_list(ids))
    }

    pub fn toggle_add_sequence_number(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.add_sequence_number;
        self.write(keys::ADD_SEQUENCE_NUMBER, value)
    }

    /// `None` resets to the default location.
    pub fn set_save_folder(&mut self, folder: Option<&str>) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::SAVE_FOLDER, folder.unwrap_or_default().to_string())
    }

    pub fn set_filename_prefix(&mut self, prefix: &str) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::FILENAME_PREFIX, prefix.to_string())
    }

    pub fn toggle_add_size_in_filename(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.add_size_in_filename;
        self.write(keys::ADD_SIZE_IN_FILENAME, value)
    }

    pub fn toggle_add_original_filename(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.add_original_filename;
        self.write(keys::ADD_ORIGINAL_FILENAME, value)
    }

    pub fn toggle_randomize_filename(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.randomize_filename;
        self.write(keys::RANDOMIZE_FILENAME, value)
    }

    pub fn toggle_overwrite_files(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.overwrite_files;
        self.write(keys::OVERWRITE_FILES, value)
    }

    pub fn set_font(&mut self, font: FontFam) -> Result<Arc<SettingsState>, SettingsError> {
        self.write_ordinal(keys::FONT, font.ordinal())
    }

    pub fn set_font_scale(&mut self, scale: f32) -> Result<Arc<SettingsState>, SettingsError> {
        self.write(keys::FONT_SCALE, scale)
    }

    pub fn toggle_allow_betas(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.allow_betas;
        self.write(keys::ALLOW_BETAS, value)
    }

    pub fn toggle_draw_container_shadows(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.draw_container_shadows;
        self.write(keys::DRAW_CONTAINER_SHADOWS, value)
    }

    pub fn increment_open_count(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = i64::from(self.state.app_open_count) + 1;
        self.write(keys::APP_OPEN_COUNT, value)
    }

    pub fn toggle_lock_draw_orientation(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.lock_draw_orientation;
        self.write(keys::LOCK_DRAW_ORIENTATION, value)
    }

    pub fn set_default_draw_mode(&mut self, mode: DrawMode) -> Result<Arc<SettingsState>, SettingsError> {
        self.write_ordinal(keys::DEFAULT_DRAW_MODE, mode.ordinal())
    }

    pub fn toggle_keep_metadata(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        let value = !self.state.keep_metadata;
        self.write(keys::KEEP_METADATA, value)
    }

    /// Remove every persisted preference, returning to defaults.
    pub fn reset(&mut self) -> Result<Arc<SettingsState>, SettingsError> {
        for key in self.store.keys() {
            self.store.remove(&key)?;
        }
        info!("settings reset to defaults");
        self.reload()
    }

    /// Set a preference from text, as typed on the command line.
    ///
    /// Booleans take `true`/`false`, enums take a name or an ordinal, lists
    /// take comma-separated numbers, and `selected_emoji`/`save_folder`
    /// take `none` to clear.
    pub fn set_by_name(&mut self, key: &str, raw: &str) -> Result<Arc<SettingsState>, SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        };
        let flag = || raw.trim().parse::<bool>().map_err(|_| invalid());
        let float = || {
            raw.trim()
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(invalid)
        };
        let list = || split_list(raw).ok_or_else(invalid);
        let clear = raw.trim().eq_ignore_ascii_case("none");

        match key {
            "night_mode" => self.set_night_mode(raw.parse().map_err(|_| invalid())?),
            "dynamic_colors" => self.write(keys::DYNAMIC_COLORS, flag()?),
            "amoled_mode" => self.write(keys::AMOLED_MODE, flag()?),
            "app_color_tuple" => self.set_app_color_tuple(raw),
            "border_width" => self.set_border_width(float()?),
            "presets" => self.set_presets(&list()?),
            "fab_alignment" => self.set_fab_alignment(raw.parse().map_err(|_| invalid())?),
            "show_update_dialog_on_startup" => self.write(keys::SHOW_UPDATE_DIALOG, flag()?),
            "selected_emoji" if clear => self.set_emoji(None),
            "selected_emoji" => self.set_emoji(Some(raw.trim().parse().map_err(|_| invalid())?)),
            "image_picker_mode" => self.set_image_picker_mode(raw.parse().map_err(|_| invalid())?),
            "clear_cache_on_launch" => self.write(keys::CLEAR_CACHE_ON_LAUNCH, flag()?),
            "group_options_by_types" => self.write(keys::GROUP_OPTIONS_BY_TYPES, flag()?),
            "screen_list" => self.set_screen_order(&list()?),
            "add_sequence_number" => self.write(keys::ADD_SEQUENCE_NUMBER, flag()?),
            "save_folder" if clear => self.set_save_folder(None),
            "save_folder" => self.set_save_folder(Some(raw)),
            "filename_prefix" => self.set_filename_prefix(raw),
            "add_size_in_filename" => self.write(keys::ADD_SIZE_IN_FILENAME, flag()?),
            "add_original_filename" => self.write(keys::ADD_ORIGINAL_FILENAME, flag()?),
            "randomize_filename" => self.write(keys::RANDOMIZE_FILENAME, flag()?),
            "overwrite_files" => self.write(keys::OVERWRITE_FILES, flag()?),
            "font" => self.set_font(raw.parse().map_err(|_| invalid())?),
            "font_scale" => self.set_font_scale(float()?),
            "allow_betas" => self.write(keys::ALLOW_BETAS, flag()?),
            "draw_container_shadows" => self.write(keys::DRAW_CONTAINER_SHADOWS, flag()?),
            "app_open_count" => {
                let count: u32 = raw.trim().parse().map_err(|_| invalid())?;
                self.write(keys::APP_OPEN_COUNT, i64::from(count))
            }
            "lock_draw_orientation" => self.write(keys::LOCK_DRAW_ORIENTATION, flag()?),
            "default_draw_mode" => self.set_default_draw_mode(raw.parse().map_err(|_| invalid())?),
            "keep_metadata" => self.write(keys::KEEP_METADATA, flag()?),
            _ => Err(SettingsError::UnknownKey(key.to_string())),
        }
    }
}
