use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A named hotkey action fired (`ocr_capture`, `only_ocr`, `cancel_selection`, ...)
    Hotkey(String),
    Retranslate {
        text: String,
        /// `None` re-runs every active engine
        engine: Option<String>,
    },
    SwapOcrEngine(String),
    SetTranslationEngines(Vec<String>),
    CreatePreset {
        kind: PresetKind,
        name: String,
    },
    UpdatePreset {
        kind: PresetKind,
        name: String,
        profile: PresetProfile,
    },
    DeletePreset {
        kind: PresetKind,
        name: String,
    },
    Shutdown,

    ShowOverlay(CaptureRegion),
    HideOverlay,
    SelectionChanged(Option<CaptureRegion>),
    OcrResult {
        text: String,
        engine: String,
        /// Whether a translation fan-out follows this result
        translate: bool,
    },
    OcrFailed {
        engine: Option<String>,
        message: String,
    },
    TranslationStarted {
        generation: u64,
        engines: Vec<String>,
    },
    Translation(TranslationEvent),
    OcrEngineChanged {
        name: String,
    },
    TranslationEnginesChanged {
        active: Vec<String>,
    },
    EngineSwapFailed {
        message: String,
    },
    AvailableEngines {
        ocr: Vec<String>,
        translation: Vec<String>,
    },
    Status(String),
    BackendReady,
}

/// Event emitted by one translation engine for one `translate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEvent {
    pub generation: u64,
    pub engine: String,
    pub kind: TranslationEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationEventKind {
    /// Full result of a batch engine
    Ready(String),
    Error(String),
    /// Partial output of a streaming engine
    Chunk(String),
    /// A streaming engine finished successfully
    Complete,
}

impl TranslationEvent {
    /// Whether this event ends the engine's unit of work.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, TranslationEventKind::Chunk(_))
    }
}

/// Which engine family a preset profile belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetKind {
    Ocr,
    Translation,
}

impl PresetKind {
    /// Configuration key holding the profiles of this kind.
    pub fn config_key(self) -> &'static str {
        match self {
            PresetKind::Ocr => "ocr_presets",
            PresetKind::Translation => "translation_presets",
        }
    }
}

/// Connection profile of an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetProfile {
    pub url: String,
    pub model: String,
    pub key: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    /// Normalized rectangle spanned by two corner points, in any order.
    pub fn from_points(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: a.x.abs_diff(b.x),
            height: a.y.abs_diff(b.y),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width as i32)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height as i32)
    }

    /// Smallest region containing both.
    pub fn union(&self, other: &CaptureRegion) -> CaptureRegion {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        CaptureRegion {
            x,
            y,
            width: x.abs_diff(right),
            height: y.abs_diff(bottom),
        }
    }

    pub fn intersection(&self, other: &CaptureRegion) -> Option<CaptureRegion> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return None;
        }
        Some(CaptureRegion {
            x,
            y,
            width: x.abs_diff(right),
            height: y.abs_diff(bottom),
        })
    }
}

/// Captured pixels, RGBA8, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RawImage {
    pub const CHANNELS: usize = 4;

    /// Fully transparent black image.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize * Self::CHANNELS],
            width,
            height,
        }
    }
}
