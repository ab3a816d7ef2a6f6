//! Rule-based narrative synthesis.
//!
//! Turns structured metrics into structured text without any external
//! generator. Every branch is deterministic, so two runs over the same
//! metrics produce identical narratives.

use futures::future::BoxFuture;
use tracing::debug;

use issuescope_core::error::GenerationError;
use issuescope_core::report::{ActionPlan, ExecutiveSummary, TechnicalAnalysis};
use issuescope_core::traits::{
    CommunityInsight, HealthInsight, InsightBundle, InsightContext, Level, MaintenanceInsight,
    NarrativeSynthesizer, ReportContext, ReportNarrative, RiskInsight, StrategicInsight,
    risk_label,
};
use issuescope_core::types::TrendDirection;

/// Deterministic synthesizer backed by threshold rules.
pub struct RuleBasedSynthesizer;

impl RuleBasedSynthesizer {
    pub fn new() -> Self {
        Self
    }

    fn health(ctx: &InsightContext) -> HealthInsight {
        let mut score: i8 = 7;
        let mut positive = Vec::new();
        let mut concerns = Vec::new();

        if ctx.trend.direction == TrendDirection::Decreasing {
            score += 1;
            positive.push("Issue volume is trending down".to_string());
        }
        if ctx.unique_authors >= 10 {
            score += 1;
            positive.push(format!(
                "Broad reporter base ({} unique authors)",
                ctx.unique_authors
            ));
        }
        if ctx.avg_comments >= 2.0 {
            positive.push("Issues receive active discussion".to_string());
        }
        if ctx.open_ratio() > 0.7 {
            score -= 2;
            concerns.push(format!(
                "High open ratio ({:.0}% of issues unresolved)",
                ctx.open_ratio() * 100.0
            ));
        }
        if ctx.stale_open_issues > 10 {
            score -= 1;
            concerns.push(format!(
                "{} open issues are older than 90 days",
                ctx.stale_open_issues
            ));
        }
        if ctx.trend.direction == TrendDirection::Increasing {
            score -= 1;
            concerns.push("Issue volume is accelerating".to_string());
        }

        let score = score.clamp(1, 10) as u8;
        HealthInsight {
            health_score: score,
            positive_indicators: positive,
            concerns,
            summary: format!(
                "Repository health scores {}/10 across {} issues with a {} trend.",
                score,
                ctx.total_issues,
                ctx.trend.direction.as_str()
            ),
        }
    }

    fn maintenance(ctx: &InsightContext) -> MaintenanceInsight {
        let open = ctx.open_issues as f64;
        let load = if open > 100.0 {
            Level::High
        } else if open > 30.0 {
            Level::Medium
        } else {
            Level::Low
        };

        let mut debt: f64 = 2.0;
        debt += (ctx.stale_open_issues as f64 / 5.0).min(4.0);
        debt += (ctx.bug_ratio() * 10.0).min(3.0);
        if ctx.security_issues > 0 {
            debt += 1.0;
        }
        let debt = (debt.min(10.0) * 10.0).round() / 10.0;

        let mut recommendations = vec!["Schedule a recurring backlog triage session".to_string()];
        if ctx.stale_open_issues > 10 {
            recommendations.push("Close or re-confirm issues older than 90 days".to_string());
        }
        if ctx.bug_ratio() > 0.4 {
            recommendations.push("Dedicate a sprint to bug-fix work".to_string());
        }

        let mut priority_areas = Vec::new();
        if ctx.security_issues > 0 {
            priority_areas.push("Security reports".to_string());
        }
        if ctx.bug_issues > 0 {
            priority_areas.push("Open bug backlog".to_string());
        }
        if priority_areas.is_empty() {
            priority_areas.push("Feature request grooming".to_string());
        }

        MaintenanceInsight {
            load_assessment: load,
            debt_score: debt,
            recommendations,
            priority_areas,
        }
    }

    fn community(ctx: &InsightContext) -> CommunityInsight {
        let engagement = if ctx.avg_comments >= 3.0 {
            Level::High
        } else if ctx.avg_comments >= 1.0 {
            Level::Medium
        } else {
            Level::Low
        };

        let mut score: i8 = 5;
        if ctx.unique_authors >= 10 {
            score += 2;
        } else if ctx.unique_authors >= 5 {
            score += 1;
        }
        if engagement == Level::High {
            score += 2;
        } else if engagement == Level::Medium {
            score += 1;
        }

        let mut growth = Vec::new();
        if ctx.unique_authors < 5 {
            growth.push("Recruit more issue reporters via contributor docs".to_string());
        }
        if ctx.avg_comments < 1.0 {
            growth.push("Respond to new issues faster to encourage discussion".to_string());
        }
        if growth.is_empty() {
            growth.push("Highlight community contributions in release notes".to_string());
        }

        CommunityInsight {
            health_score: score.clamp(1, 10) as u8,
            engagement_level: engagement,
            unique_contributors: ctx.unique_authors,
            growth_opportunities: growth,
        }
    }

    fn strategic(ctx: &InsightContext) -> StrategicInsight {
        let mut priorities = Vec::new();
        if ctx.security_issues > 0 {
            priorities.push(format!(
                "Resolve {} outstanding security reports",
                ctx.security_issues
            ));
        }
        if ctx.open_ratio() > 0.6 {
            priorities.push("Reduce the open-issue backlog below 60%".to_string());
        }
        if ctx.trend.direction == TrendDirection::Increasing {
            priorities.push("Add triage capacity ahead of rising issue volume".to_string());
        }
        if priorities.len() < 3 {
            priorities.push("Invest in automated issue labeling".to_string());
        }
        if priorities.len() < 3 {
            priorities.push("Track resolution-time metrics per label".to_string());
        }

        StrategicInsight {
            priorities,
            roadmap_impact: match ctx.trend.direction {
                TrendDirection::Increasing => {
                    "Rising issue volume will compete with feature work; budget triage time."
                        .to_string()
                }
                TrendDirection::Decreasing => {
                    "Falling issue volume frees capacity for roadmap items.".to_string()
                }
                TrendDirection::Stable => {
                    "Stable issue volume supports predictable roadmap planning.".to_string()
                }
            },
            process_improvements: vec![
                "Issue templates with required reproduction steps".to_string(),
                "Weekly triage rotation".to_string(),
            ],
        }
    }

    fn risks(ctx: &InsightContext) -> RiskInsight {
        let overall = risk_label(ctx.trend.direction, ctx.open_ratio(), ctx.security_issues);

        let mut top_risks = Vec::new();
        if ctx.security_issues > 0 {
            top_risks.push(format!(
                "{} unresolved security issues",
                ctx.security_issues
            ));
        }
        if ctx.open_ratio() > 0.7 {
            top_risks.push("Backlog growth is outpacing resolution".to_string());
        }
        if ctx.trend.direction == TrendDirection::Increasing {
            top_risks.push("Accelerating issue inflow".to_string());
        }

        let mut actions = Vec::new();
        if ctx.security_issues > 0 {
            actions.push("Prioritize security fixes this cycle".to_string());
        }
        actions.push("Review anomalous activity days for root causes".to_string());

        RiskInsight {
            overall_risk: overall,
            top_risks,
            opportunities: vec![
                "Automate labeling and duplicate detection".to_string(),
                "Publish a triage SLA".to_string(),
            ],
            recommended_actions: actions,
        }
    }
}

impl Default for RuleBasedSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NarrativeSynthesizer for RuleBasedSynthesizer {
    fn insights(
        &self,
        ctx: InsightContext,
    ) -> BoxFuture<'_, Result<InsightBundle, GenerationError>> {
        Box::pin(async move {
            debug!(repository = %ctx.repository, "Synthesizing insight bundle");
            Ok(InsightBundle {
                health: Self::health(&ctx),
                maintenance: Self::maintenance(&ctx),
                community: Self::community(&ctx),
                strategic: Self::strategic(&ctx),
                risks: Self::risks(&ctx),
            })
        })
    }

    fn report(
        &self,
        ctx: ReportContext,
    ) -> BoxFuture<'_, Result<ReportNarrative, GenerationError>> {
        Box::pin(async move {
            debug!(repository = %ctx.repository, "Synthesizing report narrative");

            let direction = ctx.trend.direction;
            let open_ratio = if ctx.total_issues == 0 {
                0.0
            } else {
                ctx.open_issues as f64 / ctx.total_issues as f64
            };

            let mut key_findings = vec![
                format!(
                    "{} issues analyzed over {} days",
                    ctx.total_issues, ctx.window_days
                ),
                format!(
                    "Issue volume trend is {} (confidence {:.0}%)",
                    direction.as_str(),
                    ctx.trend.confidence * 100.0
                ),
            ];
            if !ctx.trend.anomalies.is_empty() {
                key_findings.push(format!(
                    "{} anomalous activity days detected",
                    ctx.trend.anomalies.len()
                ));
            }
            if let Some(ref insights) = ctx.insights {
                key_findings.push(format!(
                    "Repository health scored {}/10",
                    insights.health.health_score
                ));
            }

            let recommendations = ctx
                .insights
                .as_ref()
                .map(|i| i.strategic.priorities.clone())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| {
                    vec![
                        "Establish a systematic triage process".to_string(),
                        "Monitor trend direction monthly".to_string(),
                    ]
                });

            let business_impact = match direction {
                TrendDirection::Increasing => format!(
                    "Rising issue volume in {} signals growing support load; plan capacity now.",
                    ctx.repository
                ),
                TrendDirection::Decreasing => format!(
                    "Declining issue volume in {} suggests recent quality work is paying off.",
                    ctx.repository
                ),
                TrendDirection::Stable => format!(
                    "Issue volume in {} is steady; current staffing levels should hold.",
                    ctx.repository
                ),
            };

            let mut immediate = Vec::new();
            if let Some(ref insights) = ctx.insights {
                if insights.risks.overall_risk == Level::High {
                    immediate.push("Convene a risk review this week".to_string());
                }
                immediate.extend(insights.risks.recommended_actions.iter().take(2).cloned());
            }
            if immediate.is_empty() {
                immediate.push("Review the current issue backlog".to_string());
            }

            Ok(ReportNarrative {
                executive_summary: ExecutiveSummary {
                    overview: format!(
                        "Over the last {} days, {} accumulated {} issues ({:.0}% open) with a {} trend.",
                        ctx.window_days,
                        ctx.repository,
                        ctx.total_issues,
                        open_ratio * 100.0,
                        direction.as_str()
                    ),
                    key_findings,
                    business_impact,
                    recommendations,
                },
                technical_analysis: TechnicalAnalysis {
                    methodology:
                        "Daily-rate slope comparison, weekday seasonality histogram, 2-sigma anomaly detection, linear rate extrapolation"
                            .to_string(),
                    trend_direction: Some(direction),
                    confidence_score: ctx.trend.confidence,
                    anomalies_detected: ctx.trend.anomalies.len(),
                    seasonal_patterns_found: !ctx.trend.seasonal.is_empty(),
                    patterns_identified: ctx
                        .trend
                        .anomalies
                        .iter()
                        .map(|a| format!("{} on {} ({} vs {} expected)", a.kind, a.date, a.observed, a.expected))
                        .collect(),
                    technical_recommendations: vec![
                        "Track daily issue counts on a dashboard".to_string(),
                        "Alert on days exceeding the 2-sigma band".to_string(),
                    ],
                },
                action_plan: ActionPlan {
                    immediate_actions: immediate,
                    short_term_actions: vec![
                        "Adopt issue templates and auto-labeling".to_string(),
                        "Set a first-response SLA for new issues".to_string(),
                    ],
                    long_term_actions: vec![
                        "Build trend monitoring into the release process".to_string(),
                    ],
                    success_metrics: vec![
                        "Median time-to-first-response".to_string(),
                        "Open-issue ratio below 60%".to_string(),
                    ],
                },
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issuescope_core::types::TrendSummary;

    fn ctx() -> InsightContext {
        InsightContext {
            repository: "octo/repo".into(),
            total_issues: 120,
            open_issues: 40,
            recent_issues_30d: 50,
            unique_authors: 12,
            avg_comments: 2.5,
            bug_issues: 30,
            security_issues: 2,
            stale_open_issues: 4,
            trend: TrendSummary::degraded(90),
        }
    }

    #[tokio::test]
    async fn insights_are_deterministic() {
        let synth = RuleBasedSynthesizer::new();
        let a = synth.insights(ctx()).await.unwrap();
        let b = synth.insights(ctx()).await.unwrap();
        assert_eq!(a.health.health_score, b.health.health_score);
        assert_eq!(a.maintenance.debt_score, b.maintenance.debt_score);
    }

    #[tokio::test]
    async fn security_issues_surface_in_priorities() {
        let synth = RuleBasedSynthesizer::new();
        let bundle = synth.insights(ctx()).await.unwrap();
        assert!(bundle
            .strategic
            .priorities
            .iter()
            .any(|p| p.contains("security")));
        assert!(bundle
            .maintenance
            .priority_areas
            .contains(&"Security reports".to_string()));
    }

    #[tokio::test]
    async fn strategic_priorities_fill_to_three() {
        let mut quiet = ctx();
        quiet.security_issues = 0;
        quiet.open_issues = 10;

        let synth = RuleBasedSynthesizer::new();
        let bundle = synth.insights(quiet).await.unwrap();
        assert!(bundle.strategic.priorities.len() >= 2);
    }

    #[tokio::test]
    async fn report_narrative_reflects_metrics() {
        let synth = RuleBasedSynthesizer::new();
        let insights = synth.insights(ctx()).await.unwrap();

        let narrative = synth
            .report(ReportContext {
                repository: "octo/repo".into(),
                window_days: 90,
                total_issues: 120,
                open_issues: 40,
                trend: TrendSummary::degraded(90),
                insights: Some(insights),
            })
            .await
            .unwrap();

        assert!(narrative.executive_summary.overview.contains("octo/repo"));
        assert!(narrative
            .executive_summary
            .key_findings
            .iter()
            .any(|f| f.contains("120 issues")));
        assert!(!narrative.action_plan.immediate_actions.is_empty());
    }
}
