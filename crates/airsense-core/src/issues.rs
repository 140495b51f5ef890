use crate::forecast::PredictedFields;

pub const HIGH_CO: &str = "High CO levels predicted";
pub const ELEVATED_PM2_5: &str = "Elevated PM2.5 levels predicted";
pub const ELEVATED_PM10: &str = "Elevated PM10 levels predicted";
pub const HIGH_VOC: &str = "High VOC levels predicted";
pub const ELEVATED_METHANE: &str = "Elevated methane levels predicted";
pub const COMBUSTION_RISK: &str = "Potential combustion issue detected";
pub const DRY_PARTICULATE: &str =
    "Dry conditions with high particulate matter - check filtration systems";

/// Screens a set of predicted values against fixed health rules and
/// returns the matching issue descriptions in rule order. Rules are
/// independent and may co-fire; all boundaries are strict.
pub fn evaluate(predicted: &PredictedFields) -> Vec<String> {
    let mut issues = Vec::new();

    if predicted.co > 9.0 {
        issues.push(HIGH_CO.to_string());
    }
    if predicted.pm2_5 > 25.0 {
        issues.push(ELEVATED_PM2_5.to_string());
    }
    if predicted.pm10 > 50.0 {
        issues.push(ELEVATED_PM10.to_string());
    }
    if predicted.voc > 400.0 {
        issues.push(HIGH_VOC.to_string());
    }
    if predicted.methane > 25.0 {
        issues.push(ELEVATED_METHANE.to_string());
    }

    // Compound conditions pointing at specific failure modes.
    if predicted.co > 7.0 && predicted.methane > 20.0 {
        issues.push(COMBUSTION_RISK.to_string());
    }
    if predicted.pm2_5 > 20.0 && predicted.pm10 > 40.0 && predicted.humidity < 30.0 {
        issues.push(DRY_PARTICULATE.to_string());
    }

    issues
}
