//! Hold-to-act progress engine shared by every mode.
//!
//! A [`HoldAction`] lives from the tick its input goes active until it is released, completes or
//! the governing clock expires. [`HoldAction::step`] consumes the action and only hands it back
//! while it is still in progress, so a completed hold cannot complete twice.

use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    hw::{COLUMNS, Glyph, Indicator, Panel, input::HoldInput},
    state::{
        clock::{Remaining, duration_ms},
        cues::{CueScheduler, HOLDING},
    },
};

/// Pixel columns per display cell.
const PIXELS_PER_CELL: u32 = 5;

/// What a completed hold does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldKind {
    /// Arm the objective device.
    Arm,
    /// Disarm the objective device.
    Disarm,
    /// Team A takes the zone.
    CaptureA,
    /// Team B takes the zone.
    CaptureB,
    /// Return a held zone to neutral.
    Neutralize,
}

impl HoldKind {
    /// Heading shown while the hold is in progress.
    pub fn label(self) -> &'static str {
        match self {
            HoldKind::Arm => "ARMING",
            HoldKind::Disarm => "DISARMING",
            HoldKind::CaptureA => "TEAM A TAKING",
            HoldKind::CaptureB => "TEAM B TAKING",
            HoldKind::Neutralize => "NEUTRALIZING",
        }
    }

    /// Light that blinks while the hold is in progress.
    pub fn indicator(self) -> Indicator {
        match self {
            HoldKind::Arm | HoldKind::Disarm | HoldKind::CaptureB => Indicator::Red,
            HoldKind::CaptureA => Indicator::Green,
            HoldKind::Neutralize => Indicator::Status,
        }
    }
}

/// Result of one tick of a hold.
#[derive(Debug)]
pub enum HoldStep {
    /// Still held and below 100%; the action is handed back for the next tick.
    Holding(HoldAction),
    /// The input was released early. Progress is discarded.
    Cancelled,
    /// Progress reached 100% on this tick.
    Completed(HoldKind),
    /// The governing clock ran out; this wins over completion.
    Expired,
}

/// An in-flight hold.
#[derive(Debug)]
pub struct HoldAction {
    kind: HoldKind,
    input: HoldInput,
    started_at: Instant,
    last_percent: u8,
    cues: CueScheduler,
}

impl HoldAction {
    /// Start a fresh hold at `now`.
    pub fn begin(kind: HoldKind, input: HoldInput, now: Instant) -> Self {
        debug!(?kind, ?input, "hold started");
        Self {
            kind,
            input,
            started_at: now,
            last_percent: 0,
            cues: CueScheduler::new(&HOLDING, kind.indicator()),
        }
    }

    /// What completing this hold does.
    pub fn kind(&self) -> HoldKind {
        self.kind
    }

    /// The input that must stay held.
    pub fn input(&self) -> HoldInput {
        self.input
    }

    /// Highest progress reached so far.
    pub fn last_percent(&self) -> u8 {
        self.last_percent
    }

    /// Advance the hold by one tick.
    ///
    /// `clock_expired` is the enclosing clock's expiry for this tick and `remaining` its time
    /// left, used by the urgency cues.
    pub fn step(
        mut self,
        now: Instant,
        held: bool,
        clock_expired: bool,
        remaining: Remaining,
        action_seconds: u32,
        panel: &mut Panel<'_>,
    ) -> HoldStep {
        if clock_expired {
            self.cues.silence(panel);
            debug!(kind = ?self.kind, "hold aborted by clock expiry");
            return HoldStep::Expired;
        }
        if !held {
            self.cues.silence(panel);
            debug!(kind = ?self.kind, percent = self.last_percent, "hold released early");
            return HoldStep::Cancelled;
        }

        let elapsed_ms = duration_ms(now.saturating_duration_since(self.started_at));
        let percent = progress_percent(elapsed_ms, action_seconds).max(self.last_percent);
        self.last_percent = percent;

        panel.centered(0, self.kind.label());
        panel.glyph_row(1, &bar_cells(percent));
        self.cues.step(elapsed_ms, remaining, panel);

        if percent >= 100 {
            self.cues.silence(panel);
            info!(kind = ?self.kind, input = ?self.input, "hold completed");
            HoldStep::Completed(self.kind)
        } else {
            HoldStep::Holding(self)
        }
    }
}

/// Progress after holding for `elapsed_ms`, clamped to 100.
pub fn progress_percent(elapsed_ms: u64, action_seconds: u32) -> u8 {
    let per_percent = u64::from(action_seconds.max(1)) * 10;
    // Clamped to 100 so the narrowing cannot truncate.
    (elapsed_ms / per_percent).min(100) as u8
}

/// Cells of the progress bar: full cells, then one partial cell, then blanks.
pub fn bar_cells(percent: u8) -> [Option<Glyph>; COLUMNS] {
    let total_pixels = COLUMNS as u32 * PIXELS_PER_CELL;
    let lit = u32::from(percent.min(100)) * total_pixels / 100;
    let mut cells = [None; COLUMNS];
    for (index, cell) in cells.iter_mut().enumerate() {
        let before = index as u32 * PIXELS_PER_CELL;
        let fill = lit.saturating_sub(before).min(PIXELS_PER_CELL);
        *cell = Glyph::bar(fill as u8);
    }
    cells
}
