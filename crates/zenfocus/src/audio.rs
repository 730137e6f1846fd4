//! Completion chime and ambient sound hooks
//!
//! Audio is best effort. Failures are logged here and never reach the
//! timer.

use std::io::{self, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::settings::{AmbientSound, Settings};
use crate::timer::{TimerEvent, TimerListener};

/// Audio output failure
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Audio output failed: {0}")]
    Io(#[from] io::Error),

    #[error("Ambient track '{0}' is not available on this output")]
    Unsupported(&'static str),
}

/// Something that can make noise
pub trait AudioNotifier: Send {
    fn play_completion_sound(&mut self) -> Result<(), PlaybackError>;

    /// Switch the looping background track; `None` stops it
    fn set_ambient_track(&mut self, track: Option<AmbientSound>) -> Result<(), PlaybackError>;

    /// Volume from 0.0 to 1.0
    fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError>;
}

/// No output at all
#[derive(Debug, Default)]
pub struct Silent;

impl AudioNotifier for Silent {
    fn play_completion_sound(&mut self) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn set_ambient_track(&mut self, _track: Option<AmbientSound>) -> Result<(), PlaybackError> {
        Ok(())
    }

    fn set_volume(&mut self, _volume: f32) -> Result<(), PlaybackError> {
        Ok(())
    }
}

/// Rings the terminal bell on completion. Has no ambient tracks.
#[derive(Debug)]
pub struct TerminalBell<W: Write + Send> {
    out: W,
    muted: bool,
}

impl TerminalBell<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalBell<W> {
    pub fn new(out: W) -> Self {
        Self { out, muted: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> AudioNotifier for TerminalBell<W> {
    fn play_completion_sound(&mut self) -> Result<(), PlaybackError> {
        if self.muted {
            return Ok(());
        }
        self.out.write_all(b"\x07")?;
        self.out.flush()?;
        Ok(())
    }

    fn set_ambient_track(&mut self, track: Option<AmbientSound>) -> Result<(), PlaybackError> {
        match track {
            None => Ok(()),
            Some(sound) => Err(PlaybackError::Unsupported(sound.as_str())),
        }
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError> {
        self.muted = volume <= 0.0;
        Ok(())
    }
}

/// Feeds timer events to an [`AudioNotifier`]
pub struct AudioListener<A: AudioNotifier> {
    audio: A,
    track: Option<AmbientSound>,
    volume: Option<f32>,
}

impl<A: AudioNotifier> AudioListener<A> {
    pub fn new(audio: A) -> Self {
        Self {
            audio,
            track: None,
            volume: None,
        }
    }

    /// Apply the sound settings in effect at startup
    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.apply(settings);
        self
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    fn apply(&mut self, settings: &Settings) {
        if self.volume != Some(settings.sound_volume) {
            self.volume = Some(settings.sound_volume);
            if let Err(e) = self.audio.set_volume(settings.sound_volume) {
                warn!("Failed to set volume: {}", e);
            }
        }

        let track = settings.ambient_sound.track();
        if self.track != track {
            self.track = track;
            debug!(
                "Ambient track: {}",
                track.map(|t| t.as_str()).unwrap_or("none")
            );
            if let Err(e) = self.audio.set_ambient_track(track) {
                warn!("Failed to switch ambient track: {}", e);
            }
        }
    }
}

impl<A: AudioNotifier> TimerListener for AudioListener<A> {
    fn on_event(&mut self, event: &TimerEvent) {
        match event {
            TimerEvent::Completed { .. } => {
                if let Err(e) = self.audio.play_completion_sound() {
                    warn!("Failed to play completion sound: {}", e);
                }
            }
            TimerEvent::SettingsChanged { settings } => self.apply(settings),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::session_log::SessionLog;
    use crate::settings::{SettingsPatch, SettingsStore};
    use crate::timer::Timer;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Chime,
        Track(Option<AmbientSound>),
        Volume(f32),
    }

    /// Records calls and fails every one of them
    #[derive(Clone, Default)]
    struct Broken {
        calls: Arc<Mutex<Vec<Call>>>,
    }

    impl Broken {
        fn fail(&self, call: Call) -> Result<(), PlaybackError> {
            self.calls.lock().unwrap().push(call);
            Err(PlaybackError::Io(io::Error::new(io::ErrorKind::Other, "no device")))
        }
    }

    impl AudioNotifier for Broken {
        fn play_completion_sound(&mut self) -> Result<(), PlaybackError> {
            self.fail(Call::Chime)
        }

        fn set_ambient_track(&mut self, track: Option<AmbientSound>) -> Result<(), PlaybackError> {
            self.fail(Call::Track(track))
        }

        fn set_volume(&mut self, volume: f32) -> Result<(), PlaybackError> {
            self.fail(Call::Volume(volume))
        }
    }

    fn short_timer() -> Timer<ManualClock> {
        Timer::new(
            SettingsStore::in_memory(Settings {
                focus_duration: 1,
                ..Settings::default()
            }),
            SessionLog::in_memory(),
            ManualClock::new(),
        )
    }

    #[test]
    fn test_failing_audio_never_disturbs_timer() {
        let audio = Broken::default();
        let calls = Arc::clone(&audio.calls);
        let mut timer = short_timer();
        let listener = AudioListener::new(audio).with_settings(timer.settings());
        timer.subscribe(listener);

        timer.start();
        let mut completed = None;
        for _ in 0..60 {
            completed = completed.or(timer.tick());
        }
        assert!(completed.is_some());
        assert_eq!(timer.log().len(), 1);

        timer
            .update_settings(
                &SettingsPatch::default()
                    .sound(AmbientSound::Rain)
                    .volume(0.8),
            )
            .unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                Call::Volume(0.5),
                Call::Chime,
                Call::Volume(0.8),
                Call::Track(Some(AmbientSound::Rain)),
            ]
        );
    }

    #[test]
    fn test_unchanged_sound_settings_are_not_reapplied() {
        let audio = Broken::default();
        let calls = Arc::clone(&audio.calls);
        let mut timer = short_timer();
        let listener = AudioListener::new(audio).with_settings(timer.settings());
        timer.subscribe(listener);

        timer
            .update_settings(&SettingsPatch::default().focus(30))
            .unwrap();
        assert_eq!(*calls.lock().unwrap(), vec![Call::Volume(0.5)]);
    }

    #[test]
    fn test_terminal_bell() {
        let mut bell = TerminalBell::new(Vec::new());
        bell.play_completion_sound().unwrap();
        bell.set_volume(0.0).unwrap();
        bell.play_completion_sound().unwrap();
        assert_eq!(bell.into_inner(), b"\x07".to_vec());

        let mut bell = TerminalBell::new(Vec::new());
        assert!(bell.set_ambient_track(None).is_ok());
        assert!(matches!(
            bell.set_ambient_track(Some(AmbientSound::Forest)),
            Err(PlaybackError::Unsupported("forest"))
        ));
    }
}
