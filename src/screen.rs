//! Navigation destinations.
//!
//! Every screen has a stable integer id, used to persist the user's tool
//! order. Screens opened from a share intent or a deep link carry their
//! payload; the payload-less form is what [`Screen::from_id`] and the tool
//! list hand out.

use crate::types::Uri;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", content = "payload", rename_all = "snake_case")]
pub enum Screen {
    Main,
    SingleEdit(Option<Uri>),
    ResizeAndConvert(Vec<Uri>),
    LimitsResize(Vec<Uri>),
    ResizeByBytes(Vec<Uri>),
    Crop(Option<Uri>),
    Filter(Vec<Uri>),
    Draw(Option<Uri>),
    Cipher(Option<Uri>),
    EraseBackground(Option<Uri>),
    PickColorFromImage(Option<Uri>),
    GeneratePalette(Option<Uri>),
    Compare(Vec<Uri>),
    DeleteExif(Vec<Uri>),
    ImagePreview(Vec<Uri>),
    /// Image URL to download.
    LoadNetImage(Option<String>),
    Settings,
}

/// What a screen accepts as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    None,
    Single,
    Multiple,
    Url,
}

impl Screen {
    /// Tool entries in registry order, without payload.
    pub fn tools() -> Vec<Screen> {
        vec![
            Screen::SingleEdit(None),
            Screen::ResizeAndConvert(Vec::new()),
            Screen::LimitsResize(Vec::new()),
            Screen::ResizeByBytes(Vec::new()),
            Screen::Crop(None),
            Screen::Filter(Vec::new()),
            Screen::Draw(None),
            Screen::Cipher(None),
            Screen::EraseBackground(None),
            Screen::PickColorFromImage(None),
            Screen::GeneratePalette(None),
            Screen::Compare(Vec::new()),
            Screen::DeleteExif(Vec::new()),
            Screen::ImagePreview(Vec::new()),
            Screen::LoadNetImage(None),
        ]
    }

    pub fn id(&self) -> u32 {
        match self {
            Screen::Main => 0,
            Screen::SingleEdit(_) => 1,
            Screen::ResizeAndConvert(_) => 2,
            Screen::LimitsResize(_) => 3,
            Screen::ResizeByBytes(_) => 4,
            Screen::Crop(_) => 5,
            Screen::Filter(_) => 6,
            Screen::Draw(_) => 7,
            Screen::Cipher(_) => 8,
            Screen::EraseBackground(_) => 9,
            Screen::PickColorFromImage(_) => 10,
            Screen::GeneratePalette(_) => 11,
            Screen::Compare(_) => 12,
            Screen::DeleteExif(_) => 13,
            Screen::ImagePreview(_) => 14,
            Screen::LoadNetImage(_) => 15,
            Screen::Settings => 16,
        }
    }

    pub fn from_id(id: u32) -> Option<Screen> {
        match id {
            0 => Some(Screen::Main),
            16 => Some(Screen::Settings),
            _ => Self::tools().into_iter().find(|s| s.id() == id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Screen::Main => "main",
            Screen::SingleEdit(_) => "single_edit",
            Screen::ResizeAndConvert(_) => "resize_and_convert",
            Screen::LimitsResize(_) => "limits_resize",
            Screen::ResizeByBytes(_) => "resize_by_bytes",
            Screen::Crop(_) => "crop",
            Screen::Filter(_) => "filter",
            Screen::Draw(_) => "draw",
            Screen::Cipher(_) => "cipher",
            Screen::EraseBackground(_) => "erase_background",
            Screen::PickColorFromImage(_) => "pick_color_from_image",
            Screen::GeneratePalette(_) => "generate_palette",
            Screen::Compare(_) => "compare",
            Screen::DeleteExif(_) => "delete_exif",
            Screen::ImagePreview(_) => "image_preview",
            Screen::LoadNetImage(_) => "load_net_image",
            Screen::Settings => "settings",
        }
    }

    pub fn payload_kind(&self) -> PayloadKind {
        match self {
            Screen::Main | Screen::Settings => PayloadKind::None,
            Screen::LoadNetImage(_) => PayloadKind::Url,
            Screen::SingleEdit(_)
            | Screen::Crop(_)
            | Screen::Draw(_)
            | Screen::Cipher(_)
            | Screen::EraseBackground(_)
            | Screen::PickColorFromImage(_)
            | Screen::GeneratePalette(_) => PayloadKind::Single,
            Screen::ResizeAndConvert(_)
            | Screen::LimitsResize(_)
            | Screen::ResizeByBytes(_)
            | Screen::Filter(_)
            | Screen::Compare(_)
            | Screen::DeleteExif(_)
            | Screen::ImagePreview(_) => PayloadKind::Multiple,
        }
    }

    /// The same destination carrying `uris`. `None` if it cannot take them.
    ///
    /// Single-image screens take exactly one URI. Compare needs exactly two.
    pub fn with_uris(&self, uris: &[Uri]) -> Option<Screen> {
        let list = uris.to_vec();
        let single = match uris {
            [one] => Some(one.clone()),
            _ => None,
        };
        match self {
            Screen::SingleEdit(_) => single.map(|u| Screen::SingleEdit(Some(u))),
            Screen::Crop(_) => single.map(|u| Screen::Crop(Some(u))),
            Screen::Draw(_) => single.map(|u| Screen::Draw(Some(u))),
            Screen::Cipher(_) => single.map(|u| Screen::Cipher(Some(u))),
            Screen::EraseBackground(_) => single.map(|u| Screen::EraseBackground(Some(u))),
            Screen::PickColorFromImage(_) => single.map(|u| Screen::PickColorFromImage(Some(u))),
            Screen::GeneratePalette(_) => single.map(|u| Screen::GeneratePalette(Some(u))),
            Screen::Compare(_) if uris.len() == 2 => Some(Screen::Compare(list)),
            Screen::Compare(_) => None,
            _ if uris.is_empty() => None,
            Screen::ResizeAndConvert(_) => Some(Screen::ResizeAndConvert(list)),
            Screen::LimitsResize(_) => Some(Screen::LimitsResize(list)),
            Screen::ResizeByBytes(_) => Some(Screen::ResizeByBytes(list)),
            Screen::Filter(_) => Some(Screen::Filter(list)),
            Screen::DeleteExif(_) => Some(Screen::DeleteExif(list)),
            Screen::ImagePreview(_) => Some(Screen::ImagePreview(list)),
            Screen::Main | Screen::Settings | Screen::LoadNetImage(_) => None,
        }
    }
}

/// Tools in the user's persisted order.
///
/// Ids that are not tools are ignored, duplicates count once, and tools the
/// list does not mention are appended in registry order.
pub fn ordered_tools(screen_list: &[u32]) -> Vec<Screen> {
    let mut remaining = Screen::tools();
    let mut ordered = Vec::with_capacity(remaining.len());
    for id in screen_list {
        if let Some(pos) = remaining.iter().position(|s| s.id() == *id) {
            ordered.push(remaining.remove(pos));
        }
    }
    ordered.extend(remaining);
    ordered
}

/// Destinations for shared images, in registry order, payload attached.
///
/// One image opens single-image tools as well as list tools; several images
/// only list tools (and Compare for exactly two).
pub fn shared_targets(uris: &[Uri]) -> Vec<Screen> {
    if uris.is_empty() {
        return Vec::new();
    }
    Screen::tools()
        .iter()
        .filter(|s| uris.len() == 1 || s.payload_kind() != PayloadKind::Single)
        .filter_map(|s| s.with_uris(uris))
        .collect()
}
