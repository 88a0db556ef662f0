/// Presentation-agnostic progress sink. The orchestrator depends only on
/// this trait so the engine stays usable without a terminal; the binary
/// wires in an `indicatif` bar, tests wire in a no-op or counting stub.
pub trait ProgressObserver: Send + Sync {
    fn started(&self, total: u64);
    fn increment(&self, delta: u64);
    fn finished(&self);
}

pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn started(&self, _total: u64) {}
    fn increment(&self, _delta: u64) {}
    fn finished(&self) {}
}

/// Thin wrapper around an `indicatif::ProgressBar`, used by the binary.
pub struct IndicatifProgress {
    bar: indicatif::ProgressBar,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        let bar = indicatif::ProgressBar::hidden();
        bar.set_style(
            indicatif::ProgressStyle::with_template("{spinner} {bar:40.cyan/blue} {pos}/{len} images deleted")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
        );
        IndicatifProgress { bar }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for IndicatifProgress {
    fn started(&self, total: u64) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(total);
        self.bar.set_position(0);
    }

    fn increment(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn finished(&self) {
        self.bar.finish_and_clear();
    }
}
