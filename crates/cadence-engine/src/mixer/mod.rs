//! Host mixer bootstrap and fader control.
//!
//! The orchestrator owns one group inside the host mixer (the AUTO_VJ
//! group) and keeps it healthy: scanning for it, rebuilding it from a
//! template when missing or broken, and exposing per-role fader moves.
//! It never touches strips outside its group and the padding before it.

pub mod model;
pub mod roles;
pub mod template;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use model::{MixerChannel, MixerGroup, MixerModel, Strip};
use roles::ChannelRole;
use template::TemplateStore;

pub const AUTO_VJ_GROUP_NAME: &str = "AUTO_VJ";
/// Mixer slot the group must occupy.
pub const GROUP_SLOT: usize = 7;
/// A role channel with no patterns cannot show anything.
pub const MIN_PATTERNS_PER_CHANNEL: usize = 1;
/// Below this level a channel is disabled instead of rendered silent.
pub const FADER_ENABLE_THRESHOLD: f64 = 0.01;

/// Where a role's channel lives in the mixer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelHandle {
    pub group_index: usize,
    pub lane: usize,
}

/// Result of scanning the mixer for the auto-VJ group.
///
/// `group_index` is set whenever a group with the right label exists,
/// even a malformed one, so repair knows what to remove.
#[derive(Debug, Clone, Copy)]
pub struct ScanReport {
    pub found: bool,
    pub group_index: Option<usize>,
}

/// Sole structural owner of the auto-VJ group.
pub struct MixerOrchestrator {
    model: Arc<Mutex<MixerModel>>,
    templates: TemplateStore,
    channels: HashMap<ChannelRole, ChannelHandle>,
    group_index: Option<usize>,
}

impl MixerOrchestrator {
    pub fn new(model: Arc<Mutex<MixerModel>>, templates: TemplateStore) -> Self {
        Self {
            model,
            templates,
            channels: HashMap::new(),
            group_index: None,
        }
    }

    /// Look for a usable auto-VJ group in the mixer.
    pub fn scan(&self, verbose: bool) -> ScanReport {
        let Ok(model) = self.model.lock() else {
            return ScanReport {
                found: false,
                group_index: None,
            };
        };
        Self::scan_locked(&model, verbose)
    }

    fn scan_locked(model: &MixerModel, verbose: bool) -> ScanReport {
        for (index, strip) in model.strips.iter().enumerate() {
            let Strip::Group(group) = strip else {
                continue;
            };
            if group.label != AUTO_VJ_GROUP_NAME {
                continue;
            }

            if group.channels.len() < ChannelRole::ALL.len() {
                if verbose {
                    log::warn!(
                        "Group '{AUTO_VJ_GROUP_NAME}' has {} channels, need {}",
                        group.channels.len(),
                        ChannelRole::ALL.len()
                    );
                }
                return ScanReport {
                    found: false,
                    group_index: Some(index),
                };
            }

            let missing: Vec<&str> = ChannelRole::ALL
                .iter()
                .map(|role| role.label())
                .filter(|label| !Self::has_usable_channel(group, label))
                .collect();
            if missing.is_empty() {
                return ScanReport {
                    found: true,
                    group_index: Some(index),
                };
            }
            if verbose {
                log::warn!(
                    "Group '{AUTO_VJ_GROUP_NAME}' is missing usable channels: {}",
                    missing.join(", ")
                );
            }
            return ScanReport {
                found: false,
                group_index: Some(index),
            };
        }
        ScanReport {
            found: false,
            group_index: None,
        }
    }

    fn has_usable_channel(group: &MixerGroup, label: &str) -> bool {
        group
            .channels
            .iter()
            .any(|c| c.label == label && c.patterns.len() >= MIN_PATTERNS_PER_CHANNEL)
    }

    /// Make sure a usable auto-VJ group exists at its slot.
    ///
    /// Returns true only when the group was rebuilt this call, so callers
    /// know to refresh anything derived from the old channel layout. The
    /// whole scan-and-repair sequence runs under one mixer lock; other
    /// mutators never see a half-built group.
    pub fn ensure_setup(&mut self) -> bool {
        let Ok(mut model) = self.model.lock() else {
            log::error!("Mixer lock poisoned; cannot run auto-VJ setup");
            return false;
        };

        let report = Self::scan_locked(&model, false);
        if report.found {
            if self.channels.is_empty() || self.group_index != report.group_index {
                if let Some(group_index) = report.group_index {
                    self.channels = Self::channel_map_for(&model, group_index);
                }
            }
            self.group_index = report.group_index;
            return false;
        }

        log::info!("Auto-VJ group missing or malformed; rebuilding");
        self.group_index = None;
        self.channels.clear();

        if let Some(index) = report.group_index {
            model.remove_strip(index);
        }

        // Pad with disabled placeholders so the group lands at its slot.
        // A failed rebuild leaves the padding in place for the next try.
        while model.len() < GROUP_SLOT {
            let slot = model.len();
            model.add_channel(MixerChannel::placeholder(slot));
        }
        let group_index = model.add_group(MixerGroup::new(AUTO_VJ_GROUP_NAME));

        let defs = match self
            .templates
            .load()
            .and_then(|doc| TemplateStore::reference_group(&doc, AUTO_VJ_GROUP_NAME))
        {
            Ok(defs) => defs,
            Err(e) => {
                log::error!("Failed to load auto-VJ template: {e}");
                return false;
            }
        };
        let missing: Vec<&str> = ChannelRole::ALL
            .iter()
            .map(|role| role.label())
            .filter(|label| {
                !defs
                    .iter()
                    .any(|d| d.label == *label && d.patterns.len() >= MIN_PATTERNS_PER_CHANNEL)
            })
            .collect();
        if !missing.is_empty() {
            log::error!("Auto-VJ template is missing usable channels: {}", missing.join(", "));
            return false;
        }

        if let Some(group) = model.group_at_mut(group_index) {
            for def in &defs {
                group.channels.push(MixerChannel {
                    label: def.label.clone(),
                    fader: def.fader,
                    enabled: def.enabled,
                    patterns: def.patterns.clone(),
                });
            }
        }

        model.move_strip(group_index, GROUP_SLOT);
        self.group_index = Some(GROUP_SLOT);
        self.channels = Self::channel_map_for(&model, GROUP_SLOT);
        log::info!(
            "Rebuilt auto-VJ group at slot {GROUP_SLOT} with {} channels",
            defs.len()
        );
        true
    }

    fn channel_map_for(
        model: &MixerModel,
        group_index: usize,
    ) -> HashMap<ChannelRole, ChannelHandle> {
        let mut channels = HashMap::new();
        if let Some(group) = model.group_at(group_index) {
            for (lane, channel) in group.channels.iter().enumerate() {
                if let Some(role) = ChannelRole::from_label(&channel.label) {
                    channels.insert(role, ChannelHandle { group_index, lane });
                }
            }
        }
        channels
    }

    /// Set a role's fader. Levels below [`FADER_ENABLE_THRESHOLD`] disable
    /// the channel outright instead of rendering it at zero.
    pub fn set_fader_to(&self, role: ChannelRole, level: f64) {
        let Some(handle) = self.channels.get(&role).copied() else {
            log::warn!("No channel handle for {}; setup has not run", role.label());
            return;
        };
        let Ok(mut model) = self.model.lock() else {
            return;
        };
        let Some(group) = model.group_at_mut(handle.group_index) else {
            log::warn!("Auto-VJ group vanished from slot {}", handle.group_index);
            return;
        };
        let Some(channel) = group.channels.get_mut(handle.lane) else {
            log::warn!("Auto-VJ lane {} vanished for {}", handle.lane, role.label());
            return;
        };
        // A stale handle after outside edits must not move a stranger's fader
        if channel.label != role.label() {
            log::warn!(
                "Channel at lane {} is '{}', expected '{}'; skipping fader move",
                handle.lane,
                channel.label,
                role.label()
            );
            return;
        }
        channel.fader = level;
        channel.enabled = level >= FADER_ENABLE_THRESHOLD;
    }

    /// Zero every role's fader. With `only_phrase_channels` the accent
    /// lanes (strobes, triggers) are left alone.
    pub fn turn_down_all_channels(&self, only_phrase_channels: bool) {
        for role in ChannelRole::ALL {
            if only_phrase_channels && role.is_always_audible() {
                continue;
            }
            self.set_fader_to(role, 0.0);
        }
    }

    pub fn channel_for_role(&self, role: ChannelRole) -> Option<ChannelHandle> {
        self.channels.get(&role).copied()
    }

    /// Current `(fader, enabled)` of a role's channel.
    pub fn fader_state(&self, role: ChannelRole) -> Option<(f64, bool)> {
        let handle = self.channels.get(&role)?;
        let model = self.model.lock().ok()?;
        let channel = model.group_at(handle.group_index)?.channels.get(handle.lane)?;
        Some((channel.fader, channel.enabled))
    }

    pub fn group_index(&self) -> Option<usize> {
        self.group_index
    }
}
