use std::fmt::Write;

use basicorbit::{
    approach::ProximityResult, maneuver::ManeuverBurn, state::Readout, time::UT,
};
use time::Duration;

fn hms(d: Duration) -> (u64, u8, u8) {
    let s = d.whole_seconds() % 60;
    let m = d.whole_minutes() % 60;
    let h = d.whole_hours();
    (h.unsigned_abs(), m.unsigned_abs() as u8, s.unsigned_abs() as u8)
}

/// `T-h:mm:ss` until `t`, `T+` once it has passed.
pub fn countdown(t: UT, now: UT) -> String {
    match t.until(now) {
        Some(d) => {
            let sign = if d.is_negative() { '+' } else { '-' };
            let (h, m, s) = hms(d);
            format!("T{sign}{h}:{m:02}:{s:02}")
        }
        None => "T---".to_owned(),
    }
}

pub fn distance(m: f64) -> String {
    if m >= 1e6 {
        format!("{:.3} Mm", m / 1e6)
    } else if m >= 1e3 {
        format!("{:.2} km", m / 1e3)
    } else {
        format!("{m:.1} m")
    }
}

fn panel(out: &mut String, label: &str, result: &ProximityResult, now: UT) {
    if result.intersects {
        let _ = writeln!(
            out,
            "  {label}: {} at {} ({:.1} m/s)",
            distance(result.distance),
            countdown(result.time, now),
            result.relative_velocity
        );
    } else {
        let _ = writeln!(out, "  {label}: no approach");
    }
}

fn burn(out: &mut String, burn: &ManeuverBurn, now: UT) {
    let _ = writeln!(
        out,
        "  Burn: {:.1} / {:.1} m/s, start {}{}",
        burn.delta_v_remaining,
        burn.delta_v_total,
        countdown(burn.burn_start_time, now),
        if burn.refined {
            format!(", {:.1} s", burn.burn_length)
        } else {
            String::new()
        }
    );
}

pub fn render(now: UT, readout: &Readout) -> String {
    let mut out = format!("{now}\n");
    match &readout.target_name {
        Some(name) => {
            let _ = writeln!(out, "  Target: {name}");
        }
        None => out.push_str("  Target: none\n"),
    }
    panel(&mut out, "Closest approach", &readout.target, now);
    panel(&mut out, "Maneuver approach", &readout.maneuver, now);
    if let Some(b) = &readout.burn {
        burn(&mut out, b, now);
    }
    out
}
