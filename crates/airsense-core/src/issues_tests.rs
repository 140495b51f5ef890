use crate::forecast::PredictedFields;
use crate::issues::{self, evaluate};

fn fields(fill: impl Fn(&mut PredictedFields)) -> PredictedFields {
    let mut predicted = PredictedFields::default();
    fill(&mut predicted);
    predicted
}

#[test]
fn combustion_rule_fires_without_the_plain_methane_rule_at_the_boundary() {
    // CO 8 with methane exactly 25: methane's own rule needs a strict
    // greater-than, but the compound combustion rule only needs 20.
    let predicted = fields(|p| {
        p.co = 8.0;
        p.methane = 25.0;
        p.humidity = 50.0;
    });

    let issues = evaluate(&predicted);

    assert!(
        issues.iter().any(|i| i == issues::COMBUSTION_RISK),
        "co 8 + methane 25 is the combustion signature, got {issues:?}"
    );
    assert!(
        !issues.iter().any(|i| i == issues::ELEVATED_METHANE),
        "methane at exactly 25 must not trip the strict > 25 rule"
    );
}

#[test]
fn independent_rules_co_fire() {
    let predicted = fields(|p| {
        p.co = 10.0;
        p.pm2_5 = 30.0;
        p.humidity = 50.0;
    });

    let issues = evaluate(&predicted);

    assert_eq!(
        issues,
        vec![issues::HIGH_CO.to_string(), issues::ELEVATED_PM2_5.to_string()],
        "both single-metric rules should fire, in rule order"
    );
}

#[test]
fn dry_particulate_rule_needs_all_three_conditions() {
    let dry_and_dusty = fields(|p| {
        p.pm2_5 = 22.0;
        p.pm10 = 45.0;
        p.humidity = 20.0;
    });
    assert!(
        evaluate(&dry_and_dusty)
            .iter()
            .any(|i| i == issues::DRY_PARTICULATE)
    );

    // Same particulates at comfortable humidity: rule must stay quiet.
    let humid = fields(|p| {
        p.pm2_5 = 22.0;
        p.pm10 = 45.0;
        p.humidity = 55.0;
    });
    assert!(
        !evaluate(&humid).iter().any(|i| i == issues::DRY_PARTICULATE),
        "humidity 55 breaks the compound condition"
    );
}

#[test]
fn clean_air_reports_nothing() {
    let predicted = fields(|p| {
        p.co = 2.0;
        p.pm2_5 = 8.0;
        p.pm10 = 15.0;
        p.voc = 120.0;
        p.methane = 5.0;
        p.temperature = 21.0;
        p.humidity = 45.0;
    });

    assert!(evaluate(&predicted).is_empty());
}
