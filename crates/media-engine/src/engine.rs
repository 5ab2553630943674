//! The command side of an audio engine

use crate::error::EngineResult;
use crate::events::Generation;
use std::path::Path;
use talebox_core::{Duration, PlaybackSpeed};

/// Decoding and output backend driven by a playback session
///
/// Commands return quickly. Results of `open` and all progress are delivered
/// through the engine's [`EventSender`](crate::EventSender), tagged with the
/// generation passed to the latest `open`.
pub trait AudioEngine: Send {
    /// Starts opening `path`; completion arrives as `Ready` or `OpenFailed`
    ///
    /// An error returned here means the request was rejected outright and no
    /// event will follow for this generation.
    fn open(&mut self, path: &Path, generation: Generation) -> EngineResult<()>;

    fn play(&mut self) -> EngineResult<()>;

    fn pause(&mut self) -> EngineResult<()>;

    /// Seeks within the open source; callers clamp to the known duration
    fn seek(&mut self, position: Duration) -> EngineResult<()>;

    fn set_speed(&mut self, speed: PlaybackSpeed) -> EngineResult<()>;

    /// Duration of the open source, once known
    fn duration(&self) -> Option<Duration>;
}

impl<E: AudioEngine + ?Sized> AudioEngine for Box<E> {
    fn open(&mut self, path: &Path, generation: Generation) -> EngineResult<()> {
        (**self).open(path, generation)
    }

    fn play(&mut self) -> EngineResult<()> {
        (**self).play()
    }

    fn pause(&mut self) -> EngineResult<()> {
        (**self).pause()
    }

    fn seek(&mut self, position: Duration) -> EngineResult<()> {
        (**self).seek(position)
    }

    fn set_speed(&mut self, speed: PlaybackSpeed) -> EngineResult<()> {
        (**self).set_speed(speed)
    }

    fn duration(&self) -> Option<Duration> {
        (**self).duration()
    }
}

#[cfg(test)]
mod engine_tests {
    use super::*;
    use crate::error::EngineError;
    use crate::events::{EngineEvent, EventSender};
    use std::path::PathBuf;

    /// Opens anything ending in `.mp3` with a fixed duration
    struct FixedEngine {
        events: EventSender,
        opened: Option<(PathBuf, Generation)>,
        playing: bool,
        position: Duration,
    }

    impl AudioEngine for FixedEngine {
        fn open(&mut self, path: &Path, generation: Generation) -> EngineResult<()> {
            if path.extension().and_then(|e| e.to_str()) != Some("mp3") {
                return Err(EngineError::UnsupportedFormat(path.display().to_string()));
            }
            self.opened = Some((path.to_path_buf(), generation));
            self.events.ready(generation, Duration::from_seconds(90));
            Ok(())
        }

        fn play(&mut self) -> EngineResult<()> {
            if self.opened.is_none() {
                return Err(EngineError::InvalidState("nothing open".into()));
            }
            self.playing = true;
            Ok(())
        }

        fn pause(&mut self) -> EngineResult<()> {
            self.playing = false;
            Ok(())
        }

        fn seek(&mut self, position: Duration) -> EngineResult<()> {
            self.position = position;
            Ok(())
        }

        fn set_speed(&mut self, _speed: PlaybackSpeed) -> EngineResult<()> {
            Ok(())
        }

        fn duration(&self) -> Option<Duration> {
            self.opened.as_ref().map(|_| Duration::from_seconds(90))
        }
    }

    #[tokio::test]
    async fn test_boxed_engine_forwards_commands() {
        let (events, mut rx) = EventSender::channel();
        let mut engine: Box<dyn AudioEngine> = Box::new(FixedEngine {
            events,
            opened: None,
            playing: false,
            position: Duration::ZERO,
        });

        assert!(engine.play().is_err());
        assert_eq!(engine.duration(), None);

        let generation = Generation::new(3);
        engine.open(Path::new("/books/01.mp3"), generation).unwrap();
        engine.seek(Duration::from_seconds(5)).unwrap();
        engine.play().unwrap();

        assert_eq!(engine.duration(), Some(Duration::from_seconds(90)));
        assert_eq!(
            rx.recv().await,
            Some(EngineEvent::Ready {
                generation,
                duration: Duration::from_seconds(90)
            })
        );
    }

    #[test]
    fn test_rejected_open() {
        let (events, _rx) = EventSender::channel();
        let mut engine = FixedEngine {
            events,
            opened: None,
            playing: false,
            position: Duration::ZERO,
        };

        let result = engine.open(Path::new("/books/cover.jpg"), Generation::new(1));
        assert!(matches!(result, Err(EngineError::UnsupportedFormat(_))));
    }
}
