//! Human-readable alert text

use crate::types::{decimal, AlertEvent, AlertKind};

pub fn render_alert(alert: &AlertEvent) -> String {
    match alert.kind {
        AlertKind::Simulation => format!(
            "🌍 Simulation Results 🌍\n\n\
             Simulated Location: {}\n\
             Simulated Radiation Level: {} {}\n\n\
             Simulation completed successfully.\n#Simulation #Radiation",
            alert.location,
            decimal(alert.radiation.value),
            alert.radiation.unit
        ),
        AlertKind::Detonation => {
            let (magnitude, depth) = match &alert.seismic {
                Some(s) => (s.magnitude_label.as_str(), s.depth_label.as_str()),
                None => ("Unknown", "Unknown"),
            };
            format!(
                "⚠️ Alert: Possible Detonation Detected ⚠️\n\n\
                 Location: {}\n\
                 Seismic Event: Magnitude {}, Depth {} km\n\
                 Radiation Level: {:.2} {}\n\
                 Captured At: {}\n\n\
                 #SeismicActivity #RadiationAlert",
                alert.location,
                magnitude,
                depth,
                alert.radiation.value,
                alert.radiation.unit,
                alert.radiation.captured_at
            )
        }
    }
}
