//! 专家处理阶段（错误对应猫 / 监视猫）
//!
//! IDLE → COLLECTING → MATCHING_PATTERNS → REPORTING → IDLE

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialistPhase {
    #[default]
    Idle,
    Collecting,
    MatchingPatterns,
    Reporting,
}

impl SpecialistPhase {
    /// 下一个阶段（REPORTING 之后回到 IDLE）
    pub fn next(self) -> Self {
        match self {
            SpecialistPhase::Idle => SpecialistPhase::Collecting,
            SpecialistPhase::Collecting => SpecialistPhase::MatchingPatterns,
            SpecialistPhase::MatchingPatterns => SpecialistPhase::Reporting,
            SpecialistPhase::Reporting => SpecialistPhase::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cycle() {
        let mut phase = SpecialistPhase::default();
        let mut seen = vec![phase];
        for _ in 0..4 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                SpecialistPhase::Idle,
                SpecialistPhase::Collecting,
                SpecialistPhase::MatchingPatterns,
                SpecialistPhase::Reporting,
                SpecialistPhase::Idle,
            ]
        );
    }
}
