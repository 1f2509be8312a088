//! Progress events and artifact override hooks.
//!
//! Every generation run publishes a fixed sequence of events:
//!
//! ```text
//! start
//!   defaultIconsStart  defaultIconsGen × N  defaultIconsEnd
//!   shortcutIconsStart shortcutIconsGen × N shortcutIconsEnd
//!   ...
//! end
//! ```
//!
//! Observers ([`EventBus::on`], [`EventBus::on_any`]) only watch. Generation
//! hooks ([`EventBus::on_generated`]) may replace an artifact's content or
//! its filename by returning an [`Override`]. Hooks run in registration
//! order; each sees the artifact as left by the previous one. When any hook
//! supplies a non-empty filename, the last one wins and is used verbatim
//! (no fingerprint is added). An empty filename counts as not supplied.

use std::fmt;
use std::str::FromStr;

/// An artifact-producing pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    DefaultIcons,
    ShortcutIcons,
    Favicon,
    SafariPinnedTab,
    Screenshots,
    AppleTouchIcon,
    MsTile,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Self::DefaultIcons,
        Self::ShortcutIcons,
        Self::Favicon,
        Self::SafariPinnedTab,
        Self::Screenshots,
        Self::AppleTouchIcon,
        Self::MsTile,
    ];

    /// Prefix of the stage's event names.
    pub fn event_prefix(self) -> &'static str {
        match self {
            Self::DefaultIcons => "defaultIcons",
            Self::ShortcutIcons => "shortcutIcons",
            Self::Favicon => "favicon",
            Self::SafariPinnedTab => "safariPinnedTab",
            Self::Screenshots => "screenshots",
            Self::AppleTouchIcon => "appleTouchIcon",
            Self::MsTile => "msTile",
        }
    }
}

impl fmt::Display for Stage {
    /// Human-readable artifact kind, as used in error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DefaultIcons => "icon",
            Self::ShortcutIcons => "shortcut icon",
            Self::Favicon => "favicon",
            Self::SafariPinnedTab => "Safari Pinned Tab",
            Self::Screenshots => "screenshot",
            Self::AppleTouchIcon => "Apple Touch Icon",
            Self::MsTile => "Microsoft Tile Icon",
        })
    }
}

/// The name an event is subscribed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Start,
    End,
    StageStart(Stage),
    Generated(Stage),
    StageEnd(Stage),
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::End => f.write_str("end"),
            Self::StageStart(s) => write!(f, "{}Start", s.event_prefix()),
            Self::Generated(s) => write!(f, "{}Gen", s.event_prefix()),
            Self::StageEnd(s) => write!(f, "{}End", s.event_prefix()),
        }
    }
}

impl FromStr for EventName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => return Ok(Self::Start),
            "end" => return Ok(Self::End),
            _ => {}
        }
        for stage in Stage::ALL {
            if let Some(suffix) = s.strip_prefix(stage.event_prefix()) {
                match suffix {
                    "Start" => return Ok(Self::StageStart(stage)),
                    "Gen" => return Ok(Self::Generated(stage)),
                    "End" => return Ok(Self::StageEnd(stage)),
                    _ => {}
                }
            }
        }
        Err(format!("unknown event '{s}'"))
    }
}

/// An artifact about to be stored: the proposed filename and current bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingArtifact {
    pub stage: Stage,
    pub filename: String,
    pub content: Vec<u8>,
}

/// A published event.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Start,
    StageStart {
        stage: Stage,
        message: &'a str,
    },
    Generated {
        stage: Stage,
        artifact: &'a PendingArtifact,
    },
    StageEnd {
        stage: Stage,
    },
    End,
}

impl Event<'_> {
    pub fn name(&self) -> EventName {
        match self {
            Self::Start => EventName::Start,
            Self::End => EventName::End,
            Self::StageStart { stage, .. } => EventName::StageStart(*stage),
            Self::Generated { stage, .. } => EventName::Generated(*stage),
            Self::StageEnd { stage } => EventName::StageEnd(*stage),
        }
    }
}

/// What a generation hook does with an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    /// Leave the artifact as it is.
    NotHandled,
    Content(Vec<u8>),
    Filename(String),
    ContentAndFilename(Vec<u8>, String),
}

/// An artifact after every hook has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub content: Vec<u8>,
    /// The proposed name, or the last name a hook supplied.
    pub filename: String,
    /// True when a hook supplied the filename.
    pub renamed: bool,
}

type Observer = Box<dyn FnMut(&Event<'_>) + Send>;
type WildcardObserver = Box<dyn FnMut(EventName, &Event<'_>) + Send>;
type GenerationHook = Box<dyn FnMut(&PendingArtifact) -> Override + Send>;

/// Subscriber registry. Owned by the generator; single-threaded.
#[derive(Default)]
pub struct EventBus {
    wildcard: Vec<WildcardObserver>,
    named: Vec<(EventName, Observer)>,
    hooks: Vec<(Stage, GenerationHook)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&mut self, name: EventName, observer: impl FnMut(&Event<'_>) + Send + 'static) {
        self.named.push((name, Box::new(observer)));
    }

    pub fn on_any(&mut self, observer: impl FnMut(EventName, &Event<'_>) + Send + 'static) {
        self.wildcard.push(Box::new(observer));
    }

    pub fn on_generated(
        &mut self,
        stage: Stage,
        hook: impl FnMut(&PendingArtifact) -> Override + Send + 'static,
    ) {
        self.hooks.push((stage, Box::new(hook)));
    }

    /// Deliver an event to wildcard observers, then to named observers.
    pub fn emit(&mut self, event: &Event<'_>) {
        let name = event.name();
        for observer in &mut self.wildcard {
            observer(name, event);
        }
        for (subscribed, observer) in &mut self.named {
            if *subscribed == name {
                observer(event);
            }
        }
    }

    /// Announce a generated artifact and let the stage's hooks rewrite it.
    ///
    /// Observers see the artifact as proposed by the stage.
    pub fn publish(&mut self, artifact: PendingArtifact) -> Published {
        let stage = artifact.stage;
        self.emit(&Event::Generated {
            stage,
            artifact: &artifact,
        });

        let mut current = artifact;
        let mut renamed = false;
        for (hooked, hook) in &mut self.hooks {
            if *hooked != stage {
                continue;
            }
            let (content, filename) = match hook(&current) {
                Override::NotHandled => (None, None),
                Override::Content(content) => (Some(content), None),
                Override::Filename(filename) => (None, Some(filename)),
                Override::ContentAndFilename(content, filename) => (Some(content), Some(filename)),
            };
            if let Some(content) = content {
                current.content = content;
            }
            // An empty name leaves naming to the fingerprint.
            if let Some(filename) = filename.filter(|f| !f.is_empty()) {
                current.filename = filename;
                renamed = true;
            }
        }

        Published {
            content: current.content,
            filename: current.filename,
            renamed,
        }
    }
}
