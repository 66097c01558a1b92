use wgpu::SurfaceError;

use crate::render::RenderError;

/// What the renderer does after a failed frame acquisition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface reconfigured; the next frame may succeed.
    Reconfigured,
    /// Transient; skip this frame only.
    SkipFrame,
    /// The device cannot present any more; treat the context as lost.
    Lost,
}

/// Maps an acquisition failure to the renderer's response and the error
/// reported to the frame loop.
pub(crate) fn classify(err: &SurfaceError) -> (SurfaceErrorAction, RenderError) {
    match err {
        SurfaceError::Lost | SurfaceError::Outdated => {
            (SurfaceErrorAction::Reconfigured, RenderError::SurfaceOutdated)
        }
        SurfaceError::OutOfMemory => (SurfaceErrorAction::Lost, RenderError::OutOfMemory),
        SurfaceError::Timeout => (SurfaceErrorAction::SkipFrame, RenderError::Timeout),
        SurfaceError::Other => (
            SurfaceErrorAction::SkipFrame,
            RenderError::Other(err.to_string()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_surfaces_are_reconfigured() {
        for err in [SurfaceError::Lost, SurfaceError::Outdated] {
            let (action, reported) = classify(&err);
            assert_eq!(action, SurfaceErrorAction::Reconfigured);
            assert_eq!(reported, RenderError::SurfaceOutdated);
        }
    }

    #[test]
    fn out_of_memory_loses_the_context() {
        let (action, reported) = classify(&SurfaceError::OutOfMemory);
        assert_eq!(action, SurfaceErrorAction::Lost);
        assert_eq!(reported, RenderError::OutOfMemory);
    }

    #[test]
    fn timeouts_skip_the_frame() {
        let (action, reported) = classify(&SurfaceError::Timeout);
        assert_eq!(action, SurfaceErrorAction::SkipFrame);
        assert_eq!(reported, RenderError::Timeout);

        let (action, reported) = classify(&SurfaceError::Other);
        assert_eq!(action, SurfaceErrorAction::SkipFrame);
        assert!(matches!(reported, RenderError::Other(_)));
    }
}
