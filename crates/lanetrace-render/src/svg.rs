//! SVG `d` strings for [`PathDescriptor`]s.
//!
//! Only path data is produced; building the element (stroke, gradient defs) is left to the
//! drawing layer.

use crate::model::{PathDescriptor, Segment};

pub fn path_data(path: &PathDescriptor) -> String {
    let mut out = String::new();
    let Some(start) = path.start_point() else {
        return out;
    };
    out.push('M');
    fmt_path_into(&mut out, start.x);
    out.push(',');
    fmt_path_into(&mut out, start.y);

    for seg in &path.segments {
        match *seg {
            Segment::Horizontal { x1, .. } => {
                out.push('H');
                fmt_path_into(&mut out, x1);
            }
            Segment::Transition {
                x,
                y0,
                y1,
                turn_radius: r,
                ..
            } => {
                if !(r > 0.0) {
                    out.push('V');
                    fmt_path_into(&mut out, y1);
                    continue;
                }
                // Travel is toward smaller x; heading down is a left turn then a right turn.
                let (dir, first_sweep, second_sweep) = if y1 >= y0 { (1.0, 0, 1) } else { (-1.0, 1, 0) };
                push_arc(&mut out, r, first_sweep, x + r, y0 + dir * r);
                out.push('V');
                fmt_path_into(&mut out, y1 - dir * r);
                push_arc(&mut out, r, second_sweep, x, y1);
            }
        }
    }
    out
}

fn push_arc(out: &mut String, r: f64, sweep: u8, x: f64, y: f64) {
    out.push('A');
    fmt_path_into(out, r);
    out.push(',');
    fmt_path_into(out, r);
    out.push_str(",0,0,");
    out.push(if sweep == 0 { '0' } else { '1' });
    out.push(',');
    fmt_path_into(out, x);
    out.push(',');
    fmt_path_into(out, y);
}

pub fn fmt_path(v: f64) -> String {
    let mut out = String::new();
    fmt_path_into(&mut out, v);
    out
}

/// Three fractional digits, ties half-up (including negatives), trailing zeros trimmed.
pub fn fmt_path_into(out: &mut String, v: f64) {
    if !v.is_finite() || v.abs() < 0.0005 {
        out.push('0');
        return;
    }
    let k = (v * 1000.0 + 0.5).floor() as i64;
    append_fixed_3dp_trimmed(out, k);
}

fn append_fixed_3dp_trimmed(out: &mut String, k: i64) {
    if k == 0 {
        out.push('0');
        return;
    }
    if k.is_negative() {
        out.push('-');
    }
    let abs = k.unsigned_abs();
    let int_part = abs / 1000;
    let frac = abs % 1000;

    use std::fmt::Write as _;
    let _ = write!(out, "{int_part}");
    if frac == 0 {
        return;
    }

    let digits = [
        b'0' + (frac / 100) as u8,
        b'0' + ((frac / 10) % 10) as u8,
        b'0' + (frac % 10) as u8,
    ];
    let mut end = digits.len();
    while end > 0 && digits[end - 1] == b'0' {
        end -= 1;
    }
    out.push('.');
    for &b in &digits[..end] {
        out.push(b as char);
    }
}
