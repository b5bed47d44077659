/// Popup panel animation.
///
/// Panels grow from `start_scale` to full size over `popup_ticks` render
/// ticks with an OutBack ease, so they overshoot slightly and settle.
/// Ticks keep counting while the simulation is paused. Closing is
/// immediate.

use crate::config::PanelConfig;

/// Overshoot constant of the classic back easing curves.
const BACK_OVERSHOOT: f32 = 1.70158;

pub fn ease_out_back(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let c3 = BACK_OVERSHOOT + 1.0;
    let u = t - 1.0;
    1.0 + c3 * u * u * u + BACK_OVERSHOOT * u * u
}

/// Scale of a panel `tick` render ticks after it opened.
pub fn panel_scale(cfg: &PanelConfig, tick: u32) -> f32 {
    if cfg.popup_ticks == 0 || tick >= cfg.popup_ticks {
        return 1.0;
    }
    let t = tick as f32 / cfg.popup_ticks as f32;
    cfg.start_scale + (1.0 - cfg.start_scale) * ease_out_back(t)
}

/// Size of a `w`×`h` panel at `scale`, never below 1×1.
pub fn scaled_size(w: usize, h: usize, scale: f32) -> (usize, usize) {
    let sw = ((w as f32 * scale).round() as usize).clamp(1, w.max(1) + w / 8);
    let sh = ((h as f32 * scale).round() as usize).clamp(1, h.max(1) + h / 8);
    (sw, sh)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PanelConfig {
        PanelConfig { popup_ticks: 10, start_scale: 0.1 }
    }

    #[test]
    fn out_back_hits_endpoints_and_overshoots() {
        assert!(ease_out_back(0.0).abs() < 1e-5);
        assert!((ease_out_back(1.0) - 1.0).abs() < 1e-5);
        let peak = (1..10).map(|i| ease_out_back(i as f32 / 10.0)).fold(0.0, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn scale_runs_from_start_to_one() {
        let c = cfg();
        assert!((panel_scale(&c, 0) - 0.1).abs() < 1e-5);
        assert_eq!(panel_scale(&c, 10), 1.0);
        assert_eq!(panel_scale(&c, 500), 1.0);
        let instant = PanelConfig { popup_ticks: 0, start_scale: 0.1 };
        assert_eq!(panel_scale(&instant, 0), 1.0);
    }

    #[test]
    fn scaled_size_is_at_least_one_cell() {
        assert_eq!(scaled_size(40, 10, 0.0), (1, 1));
        assert_eq!(scaled_size(40, 10, 1.0), (40, 10));
        assert_eq!(scaled_size(40, 10, 0.5), (20, 5));
    }
}
