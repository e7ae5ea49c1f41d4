use std::time::{Duration, Instant};
use winit::window::Window;

const TITLE_INTERVAL: Duration = Duration::from_millis(500);

/// Frame counter that keeps the window title showing the model and frame rate.
pub struct FrameTiming {
    last_title_time: Instant,
    frame_count: u32,
    fps: f32,
    base_title: String,
}

impl FrameTiming {
    pub fn new(base_title: impl Into<String>) -> Self {
        Self {
            last_title_time: Instant::now(),
            frame_count: 0,
            fps: 0.0,
            base_title: base_title.into(),
        }
    }

    pub fn base_title(&self) -> &str {
        &self.base_title
    }

    /// Count a frame and refresh the title every half second.
    pub fn update(&mut self, window: &Window, now: Instant, model_name: Option<&str>) {
        self.frame_count = self.frame_count.saturating_add(1);
        let elapsed = now.saturating_duration_since(self.last_title_time);
        if elapsed < TITLE_INTERVAL {
            return;
        }
        self.fps = self.frame_count as f32 / elapsed.as_secs_f32();
        self.frame_count = 0;
        self.last_title_time = now;
        window.set_title(&self.title(model_name));
    }

    fn title(&self, model_name: Option<&str>) -> String {
        match model_name {
            Some(name) => format!("{} - {} - {:.1} fps", self.base_title, name, self.fps),
            None => format!("{} - {:.1} fps", self.base_title, self.fps),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_includes_model_when_present() {
        let mut timing = FrameTiming::new("Model Inspector");
        timing.fps = 59.94;
        assert_eq!(timing.title(Some("Cube")), "Model Inspector - Cube - 59.9 fps");
        assert_eq!(timing.title(None), "Model Inspector - 59.9 fps");
        assert_eq!(timing.base_title(), "Model Inspector");
    }
}
