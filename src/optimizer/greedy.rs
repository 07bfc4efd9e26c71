//! Self-consumption baseline.
//!
//! A closed-form policy used as the comparison yardstick for the optimizer:
//! surplus generation charges the battery and the rest is exported, deficits
//! are served from the battery first and the rest is imported. Each step only
//! looks at the SOC left by the previous one.

use tracing::{debug, warn};

use crate::domain::{Dispatch, Scenario, TimeSeries};

/// Step-wise decision of the baseline policy.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct StepFlows {
    import_kw: f64,
    export_kw: f64,
    charge_kw: f64,
    discharge_kw: f64,
}

/// Run the baseline over the whole series. Never fails for a checked scenario.
///
/// Site caps are applied by clamping the grid flow. Whatever is clipped is no
/// longer balanced by any flow; that residual is reported once per run.
pub fn baseline(scenario: &Scenario, series: &TimeSeries) -> Dispatch {
    let battery = scenario.battery();
    let caps = &scenario.site.constraints;
    let dt = series.timestep_hours();
    let (min_soc, max_soc) = (battery.min_soc_kwh(), battery.max_soc_kwh());

    let mut dispatch = Dispatch::zeros(series.len(), dt);
    let mut soc = battery.initial_soc_kwh();
    let mut clipped_steps = 0usize;
    let mut worst_clip_kw = 0.0f64;

    for (t, (&load, &pv)) in series.load_kw().iter().zip(series.pv_kw()).enumerate() {
        let net = pv - load;
        let mut flows = StepFlows::default();

        if net > 0.0 {
            let headroom = (max_soc - soc).max(0.0);
            let charge_room = battery
                .max_charge_kw
                .min(headroom / (dt * battery.charge_efficiency));
            flows.charge_kw = net.min(charge_room).max(0.0);
            flows.export_kw = net - flows.charge_kw;
        } else {
            let deficit = -net;
            let available = (soc - min_soc).max(0.0);
            let discharge_room = battery
                .max_discharge_kw
                .min(available / (dt / battery.discharge_efficiency));
            flows.discharge_kw = deficit.min(discharge_room).max(0.0);
            flows.import_kw = deficit - flows.discharge_kw;
        }

        if let Some(cap) = caps.max_grid_import_kw {
            if flows.import_kw > cap {
                clipped_steps += 1;
                worst_clip_kw = worst_clip_kw.max(flows.import_kw - cap);
                flows.import_kw = cap;
            }
        }
        if let Some(cap) = caps.max_grid_export_kw {
            if flows.export_kw > cap {
                clipped_steps += 1;
                worst_clip_kw = worst_clip_kw.max(flows.export_kw - cap);
                flows.export_kw = cap;
            }
        }

        soc = battery
            .next_soc(soc, flows.charge_kw, flows.discharge_kw, dt)
            .clamp(min_soc, max_soc);

        dispatch.grid_import_kw[t] = flows.import_kw;
        dispatch.grid_export_kw[t] = flows.export_kw;
        dispatch.battery_charge_kw[t] = flows.charge_kw;
        dispatch.battery_discharge_kw[t] = flows.discharge_kw;
        dispatch.soc_kwh[t] = soc;
    }

    if clipped_steps > 0 {
        warn!(
            clipped_steps,
            worst_clip_kw, "baseline grid flows clipped to site caps; energy balance broken at those steps"
        );
    }
    debug!(
        steps = dispatch.len(),
        peak_import_kw = dispatch.peak_import_kw(),
        "baseline dispatch computed"
    );

    dispatch
}
