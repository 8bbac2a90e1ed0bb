//! Prometheus text exposition format.
//!
//! Renders target metrics into the Prometheus text exposition format
//! for scraping by a Prometheus server or compatible agent.

use std::fmt::Write;

use pulsewatch_core::HealthVerdict;

use crate::collector::TargetMetrics;

/// Render target metrics into Prometheus text format.
///
/// Produces GAUGE and COUNTER metrics with `target` labels. The verdict is
/// exposed one-hot: one series per verdict, `1` for the current one.
pub fn render_prometheus(targets: &[TargetMetrics]) -> String {
    let mut out = String::new();

    out.push_str("# HELP pulsewatch_target_status Current verdict per target (1 = active).\n");
    out.push_str("# TYPE pulsewatch_target_status gauge\n");
    for t in targets {
        for verdict in HealthVerdict::ALL {
            let _ = writeln!(
                out,
                "pulsewatch_target_status{{target=\"{}\",verdict=\"{}\"}} {}",
                escape(&t.target_id),
                verdict,
                u8::from(t.verdict == verdict)
            );
        }
    }

    out.push_str("# HELP pulsewatch_target_latency_ms Latency of the last poll in milliseconds.\n");
    out.push_str("# TYPE pulsewatch_target_latency_ms gauge\n");
    for t in targets {
        // No sample when the last poll got no response.
        if let Some(ms) = t.latency_ms {
            let _ = writeln!(
                out,
                "pulsewatch_target_latency_ms{{target=\"{}\"}} {ms}",
                escape(&t.target_id)
            );
        }
    }

    counter(&mut out, "pulsewatch_polls_total", "Completed polls.", targets, |t| t.polls_total);
    counter(
        &mut out,
        "pulsewatch_poll_errors_total",
        "Polls that carried a diagnostic message.",
        targets,
        |t| t.errors_total,
    );
    counter(
        &mut out,
        "pulsewatch_transitions_total",
        "Verdict changes.",
        targets,
        |t| t.transitions_total,
    );
    counter(
        &mut out,
        "pulsewatch_incidents_total",
        "Transitions into down.",
        targets,
        |t| t.incidents_total,
    );

    out
}

fn counter(
    out: &mut String,
    name: &str,
    help: &str,
    targets: &[TargetMetrics],
    value: impl Fn(&TargetMetrics) -> u64,
) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    for t in targets {
        let _ = writeln!(out, "{name}{{target=\"{}\"}} {}", escape(&t.target_id), value(t));
    }
}

/// Escape a label value.
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
