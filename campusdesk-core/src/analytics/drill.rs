use std::str::FromStr;

use crate::attendance::{RiskLevel, StudentAttendance};

/// Attendance-rate band used by the rate histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RateBand {
    /// Below 75%
    Critical,
    /// 75% up to 85%
    Warning,
    /// 85% up to 95%
    Good,
    /// 95% and above
    Excellent,
}

impl RateBand {
    pub const ALL: [RateBand; 4] = [RateBand::Critical, RateBand::Warning, RateBand::Good, RateBand::Excellent];

    pub fn of(rate: f64) -> RateBand {
        if rate >= 95.0 {
            RateBand::Excellent
        } else if rate >= 85.0 {
            RateBand::Good
        } else if rate >= 75.0 {
            RateBand::Warning
        } else {
            RateBand::Critical
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RateBand::Critical => "<75%",
            RateBand::Warning => "75-85%",
            RateBand::Good => "85-95%",
            RateBand::Excellent => ">=95%",
        }
    }
}

/// A chart segment the user can drill into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Risk(RiskLevel),
    Department(String),
    Band(RateBand),
}

impl Segment {
    pub fn matches(&self, student: &StudentAttendance) -> bool {
        match self {
            Segment::Risk(level) => student.risk_level == *level,
            Segment::Department(name) => student
                .department
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(name)),
            Segment::Band(band) => RateBand::of(student.attendance_rate) == *band,
        }
    }
}

impl FromStr for Segment {
    type Err = String;

    /// `risk:high`, `department:Nursing` or `band:critical`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| format!("segment '{s}' must look like risk:high, department:NAME or band:critical"))?;
        match kind.trim().to_lowercase().as_str() {
            "risk" => Ok(Segment::Risk(value.parse()?)),
            "department" | "dept" => Ok(Segment::Department(value.trim().to_string())),
            "band" => match value.trim().to_lowercase().as_str() {
                "critical" => Ok(Segment::Band(RateBand::Critical)),
                "warning" => Ok(Segment::Band(RateBand::Warning)),
                "good" => Ok(Segment::Band(RateBand::Good)),
                "excellent" => Ok(Segment::Band(RateBand::Excellent)),
                other => Err(format!("unknown band '{other}' (expected critical, warning, good or excellent)")),
            },
            other => Err(format!("unknown segment kind '{other}'")),
        }
    }
}

/// Narrow the list to one segment.
pub fn drill_down<'a>(students: &'a [StudentAttendance], segment: &Segment) -> Vec<&'a StudentAttendance> {
    students.iter().filter(|s| segment.matches(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::fixtures::student;

    #[test]
    fn drills_into_band_and_risk() {
        let students = vec![
            student(1, "Cruz", "Engineering", 96.0, RiskLevel::None),
            student(2, "Diaz", "Engineering", 70.0, RiskLevel::High),
            student(3, "Evans", "Nursing", 74.9, RiskLevel::Medium),
        ];
        assert_eq!(drill_down(&students, &Segment::Band(RateBand::Critical)).len(), 2);
        assert_eq!(drill_down(&students, &"risk:high".parse().unwrap()).len(), 1);
        assert_eq!(drill_down(&students, &"department:nursing".parse().unwrap())[0].student_id, 3);
    }

    #[test]
    fn band_boundaries() {
        assert_eq!(RateBand::of(75.0), RateBand::Warning);
        assert_eq!(RateBand::of(84.99), RateBand::Warning);
        assert_eq!(RateBand::of(95.0), RateBand::Excellent);
    }
}
