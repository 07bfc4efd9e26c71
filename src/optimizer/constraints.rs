//! Row generators for the dispatch LP.
//!
//! Each generator makes a single pass over the time index and yields one row
//! per step; none of them mutate a shared model.

use itertools::izip;

use super::model::{Bounds, Family, LinearRow, VariableLayout};
use crate::domain::{BatteryAsset, SiteConstraints};

/// Energy balance per step: `load + charge + export = pv + discharge + import`,
/// written as `-import + export + charge - discharge = pv - load`.
pub fn site_balance<'a>(
    layout: VariableLayout,
    load_kw: &'a [f64],
    pv_kw: &'a [f64],
) -> impl Iterator<Item = LinearRow> + 'a {
    izip!(0..layout.steps(), load_kw, pv_kw).map(move |(t, load, pv)| {
        LinearRow::new(
            vec![
                (layout.index(Family::GridImport, t), -1.0),
                (layout.index(Family::GridExport, t), 1.0),
                (layout.index(Family::Charge, t), 1.0),
                (layout.index(Family::Discharge, t), -1.0),
            ],
            pv - load,
        )
    })
}

/// SOC recurrence per step:
/// `soc[t] - soc[t-1] - η_c·Δt·charge[t] + Δt/η_d·discharge[t] = 0`.
///
/// At `t = 0` the previous SOC is the battery's initial SOC and moves to the rhs.
pub fn soc_dynamics(
    layout: VariableLayout,
    battery: &BatteryAsset,
    timestep_hours: f64,
) -> impl Iterator<Item = LinearRow> {
    let charge_gain = battery.charge_efficiency * timestep_hours;
    let discharge_cost = timestep_hours / battery.discharge_efficiency;
    let initial_soc = battery.initial_soc_kwh();

    (0..layout.steps()).map(move |t| {
        let mut terms = vec![
            (layout.index(Family::Soc, t), 1.0),
            (layout.index(Family::Charge, t), -charge_gain),
            (layout.index(Family::Discharge, t), discharge_cost),
        ];
        let rhs = if t == 0 {
            initial_soc
        } else {
            terms.push((layout.index(Family::Soc, t - 1), -1.0));
            0.0
        };
        LinearRow::new(terms, rhs)
    })
}

/// `import[t] - peak <= 0` for every step; empty without a peak variable.
pub fn peak_tracking(layout: VariableLayout) -> impl Iterator<Item = LinearRow> {
    let peak = layout.peak();
    (0..layout.steps()).filter_map(move |t| {
        peak.map(|peak| {
            LinearRow::new(
                vec![(layout.index(Family::GridImport, t), 1.0), (peak, -1.0)],
                0.0,
            )
        })
    })
}

/// Box bounds for every variable.
///
/// Grid import is capped by the tighter of the site import cap and the swept
/// `peak_limit`; SOC is held inside the battery's SOC window.
pub fn variable_bounds(
    layout: VariableLayout,
    battery: &BatteryAsset,
    site: &SiteConstraints,
    peak_limit: Option<f64>,
) -> Vec<Bounds> {
    let import_cap = match (site.max_grid_import_kw, peak_limit) {
        (Some(cap), Some(limit)) => Some(cap.min(limit)),
        (cap, limit) => cap.or(limit),
    };
    let family_bounds = |family: Family| match family {
        Family::GridImport => Bounds {
            lower: 0.0,
            upper: import_cap,
        },
        Family::GridExport => Bounds {
            lower: 0.0,
            upper: site.max_grid_export_kw,
        },
        Family::Charge => Bounds::between(0.0, battery.max_charge_kw),
        Family::Discharge => Bounds::between(0.0, battery.max_discharge_kw),
        Family::Soc => Bounds::between(battery.min_soc_kwh(), battery.max_soc_kwh()),
    };

    let mut bounds: Vec<Bounds> = [
        Family::GridImport,
        Family::GridExport,
        Family::Charge,
        Family::Discharge,
        Family::Soc,
    ]
    .into_iter()
    .flat_map(|family| std::iter::repeat(family_bounds(family)).take(layout.steps()))
    .collect();

    if layout.peak().is_some() {
        bounds.push(Bounds::non_negative());
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery() -> BatteryAsset {
        BatteryAsset::new(10.0, 5.0, 4.0)
    }

    #[test]
    fn test_site_balance_rows() {
        let layout = VariableLayout::new(2, false);
        let rows: Vec<_> = site_balance(layout, &[5.0, 1.0], &[3.0, 4.0]).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rhs, -2.0);
        assert_eq!(rows[1].rhs, 3.0);
        assert!(rows[1].terms.contains(&(layout.index(Family::GridImport, 1), -1.0)));
        assert!(rows[1].terms.contains(&(layout.index(Family::Discharge, 1), -1.0)));
    }

    #[test]
    fn test_soc_dynamics_first_row_uses_initial_soc() {
        let layout = VariableLayout::new(3, false);
        let rows: Vec<_> = soc_dynamics(layout, &battery(), 0.25).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].rhs, 5.0);
        assert_eq!(rows[0].terms.len(), 3);
        assert_eq!(rows[2].rhs, 0.0);
        assert!(rows[2].terms.contains(&(layout.index(Family::Soc, 1), -1.0)));

        // Idle step keeps SOC: soc[0] = 5 satisfies row 0 with zero flows.
        let mut values = vec![0.0; layout.len()];
        values[layout.index(Family::Soc, 0)] = 5.0;
        assert_eq!(rows[0].evaluate(&values), rows[0].rhs);
    }

    #[test]
    fn test_peak_tracking_only_with_peak_variable() {
        assert_eq!(peak_tracking(VariableLayout::new(4, false)).count(), 0);
        let rows: Vec<_> = peak_tracking(VariableLayout::new(4, true)).collect();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.terms.contains(&(20, -1.0))));
    }

    #[test]
    fn test_import_bound_takes_tighter_cap() {
        let layout = VariableLayout::new(2, false);
        let site = SiteConstraints {
            max_grid_import_kw: Some(8.0),
            max_grid_export_kw: None,
        };

        let bounds = variable_bounds(layout, &battery(), &site, Some(3.0));
        assert_eq!(bounds.len(), 10);
        assert_eq!(bounds[0].upper, Some(3.0));
        assert_eq!(bounds[layout.index(Family::GridExport, 0)].upper, None);
        assert_eq!(bounds[layout.index(Family::Discharge, 1)].upper, Some(4.0));
        assert_eq!(bounds[layout.index(Family::Soc, 1)], Bounds::between(1.0, 9.0));

        let bounds = variable_bounds(layout, &battery(), &site, None);
        assert_eq!(bounds[1].upper, Some(8.0));

        let bounds = variable_bounds(layout, &battery(), &SiteConstraints::default(), None);
        assert_eq!(bounds[0].upper, None);
    }
}
