//! Audio sink contract.
//!
//! The engine only emits requests; the synthesizer collaborator owns
//! channels, priorities, and the three hardware presets. A preset with a
//! monophonic limit (PC-Speaker) plays melody tracks only.

use std::fmt::Display;

use log::debug;

/// The enumerated music themes a world can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicTheme {
    Heroic,
    Mysterious,
    Peaceful,
    Danger,
    Exploration,
    Combat,
    Village,
    Castle,
}

impl MusicTheme {
    pub fn from_name(name: &str) -> Option<MusicTheme> {
        match name {
            "heroic" => Some(MusicTheme::Heroic),
            "mysterious" => Some(MusicTheme::Mysterious),
            "peaceful" => Some(MusicTheme::Peaceful),
            "danger" => Some(MusicTheme::Danger),
            "exploration" => Some(MusicTheme::Exploration),
            "combat" => Some(MusicTheme::Combat),
            "village" => Some(MusicTheme::Village),
            "castle" => Some(MusicTheme::Castle),
            _ => None,
        }
    }
}

impl Display for MusicTheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MusicTheme::Heroic => "heroic",
            MusicTheme::Mysterious => "mysterious",
            MusicTheme::Peaceful => "peaceful",
            MusicTheme::Danger => "danger",
            MusicTheme::Exploration => "exploration",
            MusicTheme::Combat => "combat",
            MusicTheme::Village => "village",
            MusicTheme::Castle => "castle",
        };
        write!(f, "{name}")
    }
}

/// Synthesizer hardware presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    PcSpeaker,
    #[default]
    AdLib,
    Mt32,
}

impl Preset {
    /// Monophonic presets only play melody tracks.
    pub fn is_monophonic(self) -> bool {
        matches!(self, Preset::PcSpeaker)
    }
}

/// Per-sound tweaks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SoundOpts {
    pub pitch: Option<f32>,
    pub pan: Option<f32>,
}

/// The audio collaborator the engine emits requests to.
pub trait AudioSink {
    fn play_sound(&mut self, id: &str, opts: SoundOpts);
    fn play_music(&mut self, theme: MusicTheme, preset: Preset);
    fn set_music_intensity(&mut self, intensity: f32);
    fn stop_music(&mut self);
    fn mute_track(&mut self, track: &str, muted: bool);
    fn play_leitmotif(&mut self, id: &str);
    /// Channel volume 0..1; channels are master/music/sfx/ambient.
    fn set_volume(&mut self, _channel: &str, _level: f32) {}
}

/// Sink that swallows everything; used headless and in tests.
#[derive(Debug, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_sound(&mut self, id: &str, _opts: SoundOpts) {
        debug!("audio: play_sound({id})");
    }
    fn play_music(&mut self, theme: MusicTheme, preset: Preset) {
        debug!("audio: play_music({theme}, {preset:?})");
    }
    fn set_music_intensity(&mut self, _intensity: f32) {}
    fn stop_music(&mut self) {}
    fn mute_track(&mut self, _track: &str, _muted: bool) {}
    fn play_leitmotif(&mut self, id: &str) {
        debug!("audio: play_leitmotif({id})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_names_round_trip() {
        for theme in [
            MusicTheme::Heroic,
            MusicTheme::Mysterious,
            MusicTheme::Peaceful,
            MusicTheme::Danger,
            MusicTheme::Exploration,
            MusicTheme::Combat,
            MusicTheme::Village,
            MusicTheme::Castle,
        ] {
            assert_eq!(MusicTheme::from_name(&theme.to_string()), Some(theme));
        }
        assert_eq!(MusicTheme::from_name("disco"), None);
    }

    #[test]
    fn pc_speaker_is_monophonic() {
        assert!(Preset::PcSpeaker.is_monophonic());
        assert!(!Preset::AdLib.is_monophonic());
        assert!(!Preset::Mt32.is_monophonic());
    }
}
