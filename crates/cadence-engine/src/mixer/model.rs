//! In-memory model of the host mixer.
//!
//! The engine never talks to real fixtures; it edits this model and the
//! host renders from it. Strips live in a flat list where position is
//! meaningful, the same way a hardware mixer numbers its channels.

/// A single mixer channel.
#[derive(Debug, Clone)]
pub struct MixerChannel {
    pub label: String,
    /// Fader level in `0.0..=1.0`.
    pub fader: f64,
    pub enabled: bool,
    /// Pattern class names loaded into this channel.
    pub patterns: Vec<String>,
}

impl MixerChannel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fader: 1.0,
            enabled: true,
            patterns: Vec::new(),
        }
    }

    /// Disabled padding channel for an unused slot.
    pub fn placeholder(slot: usize) -> Self {
        Self {
            label: format!("Channel {}", slot + 1),
            fader: 1.0,
            enabled: false,
            patterns: Vec::new(),
        }
    }
}

/// A group strip holding child channels.
#[derive(Debug, Clone)]
pub struct MixerGroup {
    pub label: String,
    pub fader: f64,
    pub enabled: bool,
    pub channels: Vec<MixerChannel>,
}

impl MixerGroup {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            fader: 1.0,
            enabled: true,
            channels: Vec::new(),
        }
    }
}

/// One slot in the mixer: a plain channel or a group.
#[derive(Debug, Clone)]
pub enum Strip {
    Channel(MixerChannel),
    Group(MixerGroup),
}

impl Strip {
    pub fn label(&self) -> &str {
        match self {
            Strip::Channel(channel) => &channel.label,
            Strip::Group(group) => &group.label,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Strip::Group(_))
    }
}

/// The mixer as the engine sees it.
#[derive(Debug, Clone, Default)]
pub struct MixerModel {
    pub strips: Vec<Strip>,
}

impl MixerModel {
    pub fn new() -> Self {
        Self { strips: Vec::new() }
    }

    pub fn add_channel(&mut self, channel: MixerChannel) -> usize {
        self.strips.push(Strip::Channel(channel));
        self.strips.len() - 1
    }

    pub fn add_group(&mut self, group: MixerGroup) -> usize {
        self.strips.push(Strip::Group(group));
        self.strips.len() - 1
    }

    pub fn remove_strip(&mut self, index: usize) {
        if index >= self.strips.len() {
            return;
        }
        self.strips.remove(index);
    }

    /// Move a strip to a new slot, shifting the strips in between.
    pub fn move_strip(&mut self, from: usize, to: usize) {
        if from >= self.strips.len() || to >= self.strips.len() || from == to {
            return;
        }
        let strip = self.strips.remove(from);
        self.strips.insert(to, strip);
    }

    pub fn group_at(&self, index: usize) -> Option<&MixerGroup> {
        match self.strips.get(index) {
            Some(Strip::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn group_at_mut(&mut self, index: usize) -> Option<&mut MixerGroup> {
        match self.strips.get_mut(index) {
            Some(Strip::Group(group)) => Some(group),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.strips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strips.is_empty()
    }
}
