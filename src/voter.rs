use crate::analysis::token_overlap;
use crate::config::EnsembleConfig;
use crate::types::{sort_descriptions, Description, EngineResult};
use std::collections::HashMap;
use tracing::debug;

/// Output of one voting pass: the authoritative description set plus the
/// aggregate metrics and tuning hints surfaced on the processing result.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    pub descriptions: Vec<Description>,
    pub quality_metrics: HashMap<String, f64>,
    pub recommendations: Vec<String>,
}

impl VoteOutcome {
    fn empty() -> Self {
        Self {
            descriptions: Vec::new(),
            quality_metrics: HashMap::new(),
            recommendations: Vec::new(),
        }
    }
}

struct Member {
    description: Description,
    engine_name: String,
    /// Index of the engine in the invocation (registration) order.
    engine_order: usize,
}

struct Cluster {
    members: Vec<Member>,
    /// Index into `members` of the current representative: the
    /// highest-confidence member, ties broken by position then engine order.
    representative: usize,
}

impl Cluster {
    fn seed(member: Member) -> Self {
        Self {
            members: vec![member],
            representative: 0,
        }
    }

    fn representative(&self) -> &Member {
        &self.members[self.representative]
    }

    fn push(&mut self, member: Member) {
        let rep = self.representative();
        let d = &member.description;
        let r = &rep.description;

        let takes_over = d.confidence_score > r.confidence_score
            || (d.confidence_score == r.confidence_score
                && (d.position_in_chapter < r.position_in_chapter
                    || (d.position_in_chapter == r.position_in_chapter
                        && member.engine_order < rep.engine_order)));

        self.members.push(member);
        if takes_over {
            self.representative = self.members.len() - 1;
        }
    }

    /// Names of distinct contributing engines, in first-contribution order.
    fn distinct_engines(&self) -> Vec<&str> {
        let mut engines: Vec<&str> = Vec::new();
        for member in &self.members {
            if !engines.contains(&member.engine_name.as_str()) {
                engines.push(&member.engine_name);
            }
        }
        engines
    }
}

/// Combines several engines' raw outputs into one deduplicated,
/// confidence-scored description set via weighted consensus.
///
/// Deliberately independent of the orchestrator so it can be tested on bare
/// `EngineResult` fixtures.
pub struct EnsembleVoter {
    config: EnsembleConfig,
    /// Resolved per-engine voting weights (ensemble overrides already applied).
    weights: HashMap<String, f64>,
}

impl EnsembleVoter {
    pub fn new(config: EnsembleConfig, weights: HashMap<String, f64>) -> Self {
        Self { config, weights }
    }

    fn engine_weight(&self, name: &str) -> f64 {
        self.weights.get(name).copied().unwrap_or(1.0)
    }

    /// Run the full voting pass over raw engine results.
    ///
    /// Results must be supplied in engine registration order; failed results
    /// are skipped and excluded from the consensus denominator.
    pub fn combine(&self, results: &[EngineResult]) -> VoteOutcome {
        let ran: Vec<&EngineResult> = results.iter().filter(|r| r.succeeded()).collect();
        let failed = results.len() - ran.len();

        if ran.is_empty() {
            return VoteOutcome::empty();
        }

        // One contributor means nothing to vote on.
        if ran.len() == 1 {
            return self.pass_through(ran[0], failed, results.len());
        }

        let clusters = self.cluster(&ran);
        let total_weight: f64 = ran.iter().map(|r| self.engine_weight(&r.engine_name)).sum();

        let mut descriptions = Vec::new();
        let mut accepted = 0usize;

        for cluster in &clusters {
            let cluster_weight: f64 = cluster
                .distinct_engines()
                .iter()
                .map(|name| self.engine_weight(name))
                .sum();
            let ratio = cluster_weight / total_weight;

            if ratio >= self.config.consensus_threshold {
                accepted += 1;
                descriptions.push(self.elect(cluster, ratio));
            } else {
                debug!(
                    "cluster at position {} rejected: weight ratio {:.3} below threshold {:.3}",
                    cluster.representative().description.position_in_chapter,
                    ratio,
                    self.config.consensus_threshold
                );
            }
        }

        sort_descriptions(&mut descriptions);

        let mut outcome = VoteOutcome::empty();
        outcome.quality_metrics = self.metrics(&descriptions, accepted, clusters.len(), ran.len(), failed);
        outcome.recommendations = self.recommendations(&descriptions, accepted, clusters.len(), ran.len(), failed);
        outcome.descriptions = descriptions;
        outcome
    }

    /// Single-pass clustering: each description is compared against existing
    /// cluster representatives only, keeping cost near-linear.
    fn cluster(&self, ran: &[&EngineResult]) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = Vec::new();

        for (engine_order, result) in ran.iter().enumerate() {
            for description in &result.descriptions {
                let member = Member {
                    description: description.clone(),
                    engine_name: result.engine_name.clone(),
                    engine_order,
                };

                match clusters.iter_mut().find(|c| self.matches(c, description)) {
                    Some(cluster) => cluster.push(member),
                    None => clusters.push(Cluster::seed(member)),
                }
            }
        }

        clusters
    }

    fn matches(&self, cluster: &Cluster, description: &Description) -> bool {
        let rep = &cluster.representative().description;
        if rep.description_type != description.description_type {
            return false;
        }

        let distance = rep
            .position_in_chapter
            .abs_diff(description.position_in_chapter);
        if distance > self.config.position_window {
            return false;
        }

        token_overlap(&rep.content, &description.content) >= self.config.similarity_floor
    }

    /// Build the output description for an accepted cluster: representative
    /// text, weighted-average confidence, unioned context and entities.
    fn elect(&self, cluster: &Cluster, consensus_ratio: f64) -> Description {
        let mut elected = cluster.representative().description.clone();

        let mut weighted_confidence = 0.0;
        let mut weight_sum = 0.0;
        for member in &cluster.members {
            let weight = self.engine_weight(&member.engine_name);
            weighted_confidence += weight * member.description.confidence_score;
            weight_sum += weight;
        }
        if weight_sum > 0.0 {
            elected.confidence_score = (weighted_confidence / weight_sum).clamp(0.0, 1.0);
        }

        let mut contexts: Vec<&str> = Vec::new();
        let mut entities: Vec<String> = Vec::new();
        for member in &cluster.members {
            if let Some(context) = member.description.context.as_deref() {
                if !context.is_empty() && !contexts.contains(&context) {
                    contexts.push(context);
                }
            }
            for entity in &member.description.entities_mentioned {
                if !entities.contains(entity) {
                    entities.push(entity.clone());
                }
            }
        }
        if !contexts.is_empty() {
            elected.context = Some(contexts.join("\n"));
        }
        elected.entities_mentioned = entities;

        elected.priority_score =
            self.priority_score(elected.confidence_score, consensus_ratio, &elected);
        elected
    }

    /// Priority blends recomputed confidence (primary), consensus strength,
    /// and the configurable per-type weighting.
    fn priority_score(&self, confidence: f64, consensus_ratio: f64, description: &Description) -> f64 {
        let type_weight = self
            .config
            .type_priority_weights
            .get(&description.description_type)
            .copied()
            .unwrap_or(1.0);

        ((0.6 * confidence + 0.4 * consensus_ratio) * 100.0 * type_weight).clamp(0.0, 100.0)
    }

    /// A single-engine run bypasses clustering entirely: descriptions pass
    /// through with their confidence unchanged, ranked by the same priority
    /// function at full consensus.
    fn pass_through(&self, result: &EngineResult, failed: usize, invoked: usize) -> VoteOutcome {
        let mut descriptions: Vec<Description> = result
            .descriptions
            .iter()
            .cloned()
            .map(|mut d| {
                d.priority_score = self.priority_score(d.confidence_score, 1.0, &d);
                d
            })
            .collect();
        sort_descriptions(&mut descriptions);

        let mut outcome = VoteOutcome::empty();
        outcome.quality_metrics =
            self.metrics(&descriptions, descriptions.len(), descriptions.len(), 1, failed);
        if invoked > 1 {
            outcome.recommendations.push(format!(
                "only 1 of {} engines produced output - ensemble voting was skipped",
                invoked
            ));
        }
        outcome.descriptions = descriptions;
        outcome
    }

    fn metrics(
        &self,
        descriptions: &[Description],
        accepted: usize,
        total_clusters: usize,
        engines_ran: usize,
        engines_failed: usize,
    ) -> HashMap<String, f64> {
        let mut metrics = HashMap::new();

        let consensus_rate = if total_clusters > 0 {
            accepted as f64 / total_clusters as f64
        } else {
            0.0
        };
        metrics.insert("consensus_rate".to_string(), consensus_rate);

        let avg_confidence = if descriptions.is_empty() {
            0.0
        } else {
            descriptions.iter().map(|d| d.confidence_score).sum::<f64>() / descriptions.len() as f64
        };
        metrics.insert("avg_confidence".to_string(), avg_confidence);

        metrics.insert("engines_ran".to_string(), engines_ran as f64);
        metrics.insert("engines_failed".to_string(), engines_failed as f64);

        if !descriptions.is_empty() {
            for ty in crate::types::DescriptionType::all() {
                let count = descriptions
                    .iter()
                    .filter(|d| d.description_type == ty)
                    .count();
                metrics.insert(
                    format!("coverage.{}", ty.label()),
                    count as f64 / descriptions.len() as f64,
                );
            }
        }

        metrics
    }

    fn recommendations(
        &self,
        descriptions: &[Description],
        accepted: usize,
        total_clusters: usize,
        engines_ran: usize,
        engines_failed: usize,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();

        if engines_failed > 0 {
            recommendations.push(format!(
                "{} engine(s) failed or timed out - consensus was computed over the {} that ran",
                engines_failed, engines_ran
            ));
        }

        if total_clusters > 0 {
            let consensus_rate = accepted as f64 / total_clusters as f64;
            if consensus_rate < 0.5 {
                recommendations.push(
                    "low consensus between engines - consider adding an engine or lowering the consensus threshold"
                        .to_string(),
                );
            }
        }

        if descriptions.is_empty() && total_clusters > 0 {
            recommendations.push(format!(
                "no span met the consensus threshold of {:.2} - ensemble mode trades recall for precision",
                self.config.consensus_threshold
            ));
        }

        recommendations
    }
}
