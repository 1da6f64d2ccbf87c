//! Randomized invariants (seeded, deterministic).
//!
//! - doubt never rises when the best candidate gets stronger
//! - every record keeps its scores in range and needsReview / tier in sync
//! - heading parts only ever follow a heading

use rand::{rngs::StdRng, Rng, SeedableRng};

use script_line_classifier::classify::doubt::doubt_score;
use script_line_classifier::classify::{classify, Classifier, DocumentMemory};
use script_line_classifier::line_type::NEEDS_REVIEW_DOUBT;
use script_line_classifier::vocab::Vocabulary;
use script_line_classifier::{ConfidenceTier, LineType};

const POOL: &[&str] = &[
    "",
    "بسم الله الرحمن الرحيم",
    "مشهد 1",
    "مشهد 2 - داخلي - المطبخ - نهار",
    "المشهد رقم 3",
    "بيت أحمد - ليل",
    "الشارع - يركض عمر مسرعاً",
    "في المقهى",
    "سارة:",
    "أحمد:",
    "سارة",
    "(بهدوء)",
    "(يبتسم)",
    "أين كنت طوال الليل؟",
    "- في العمل، كما تعرفين.",
    "مرحباً كيف حالك؟",
    "يدخل أحمد إلى الغرفة",
    "تجلس سارة إلى الطاولة وتشرب القهوة.",
    "ثم ينظر حوله",
    "يبتسم",
    "قطع إلى:",
    "مزج",
    "الباب مفتوح -",
    "نسمع صوت المطر في الخارج، ويبدو أن العاصفة لن تهدأ قبل الفجر.",
    "عمر: لا أعرف",
];

fn random_doc(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| POOL[rng.random_range(0..POOL.len())])
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn doubt_is_non_increasing_in_best_score() {
    let mut rng = StdRng::seed_from_u64(7);
    let vocab = Vocabulary::builtin();
    let texts = ["سارة", "المطبخ - ليل", "الشارع - يركض عمر", "مرحبا"];
    let types = [LineType::Dialogue, LineType::Character, LineType::Parenthetical];

    for _ in 0..2_000 {
        let best: f32 = rng.random_range(0.0..100.0);
        let mut others: Vec<(LineType, f32)> = types
            .iter()
            .map(|t| (*t, rng.random_range(0.0..=best)))
            .collect();
        others.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        let text = texts[rng.random_range(0..texts.len())];

        let mut ranked = vec![(LineType::Action, best)];
        ranked.extend(others.iter().copied());
        let before = doubt_score(&ranked, text, &vocab);

        let stronger = (best + rng.random_range(0.0..30.0)).min(100.0);
        ranked[0].1 = stronger;
        let after = doubt_score(&ranked, text, &vocab);

        assert!(
            after <= before,
            "doubt rose from {before} to {after} when best went {best} -> {stronger} ({ranked:?})"
        );
        assert!((0.0..=100.0).contains(&after));
    }
}

#[test]
fn records_stay_consistent_on_random_documents() {
    let mut rng = StdRng::seed_from_u64(42);
    let classifier = Classifier::default();

    for _ in 0..300 {
        let len = rng.random_range(1..25);
        let doc = random_doc(&mut rng, len);
        let line_count = doc.lines().count();
        let out = classifier.classify(&doc, &[], &mut DocumentMemory::new(), None);

        let mut seen = vec![false; line_count];
        for r in &out {
            assert!(r.index < line_count, "index out of range in {doc:?}");
            seen[r.index] = true;
            assert!((0.0..=100.0).contains(&r.confidence));
            assert!((0.0..=100.0).contains(&r.doubt_score));
            assert_eq!(r.needs_review, r.doubt_score >= NEEDS_REVIEW_DOUBT, "{r:?}");
            assert_eq!(r.confidence_tier, ConfidenceTier::from_score(r.confidence), "{r:?}");
            for s in r.scores.values() {
                assert!((0.0..=100.0).contains(&s.score), "{r:?}");
            }
            if r.line_type == LineType::Blank {
                assert!(r.text.trim().is_empty());
            }
        }
        assert!(seen.iter().all(|s| *s), "some line got no record in {doc:?}");
    }
}

#[test]
fn heading_parts_follow_a_heading() {
    let mut rng = StdRng::seed_from_u64(1234);
    for _ in 0..300 {
        let len = rng.random_range(2..20);
        let doc = random_doc(&mut rng, len);
        let out = classify(&doc, None, None);
        for (i, r) in out.iter().enumerate() {
            if !matches!(r.line_type, LineType::HeadingDetail | LineType::HeadingPlace) {
                continue;
            }
            let prev = out[..i]
                .iter()
                .rev()
                .find(|p| p.line_type != LineType::Blank)
                .map(|p| p.line_type);
            assert!(
                prev.is_some_and(|p| p.is_heading()),
                "{} at {i} follows {prev:?} in {doc:?}",
                r.line_type
            );
        }
    }
}
