// tests/classify_examples.rs
//
// End-to-end behaviour of the classification pipeline on small screenplay
// fragments: worked examples, structural headings, memory, learning.

use script_line_classifier::classify::context::ContextBuilder;
use script_line_classifier::classify::learning::AdaptiveWeights;
use script_line_classifier::classify::scoring::{LineEvidence, ScoringEngine};
use script_line_classifier::classify::{
    classify, AddConfidence, Classifier, DocumentMemory, KnownConfidence, SceneHeaderParser,
};
use script_line_classifier::vocab::Vocabulary;
use script_line_classifier::{ConfidenceTier, LineClassification, LineType};

fn types(records: &[LineClassification]) -> Vec<LineType> {
    records.iter().map(|r| r.line_type).collect()
}

const SCENE: &str = "\
بسم الله الرحمن الرحيم

مشهد 1 - داخلي - المطبخ - نهار
تجلس سارة إلى الطاولة وتشرب القهوة.

سارة:
(بهدوء)
أين كنت طوال الليل؟

أحمد:
- في العمل، كما تعرفين.

يخرج أحمد مسرعاً.

قطع إلى:

مشهد 2
الشارع - ليل
يركض عمر تحت المطر.";

#[test]
fn heading_then_action_example() {
    let out = classify("مشهد 1\nبيت أحمد - ليل\nيدخل أحمد إلى الغرفة\nينظر حوله", None, None);
    assert_eq!(
        types(&out),
        vec![
            LineType::HeadingNumberOnly,
            LineType::HeadingDetail,
            LineType::Action,
            LineType::Action,
        ]
    );
}

#[test]
fn character_then_dialogue_example() {
    let out = classify("أحمد:\nمرحباً كيف حالك؟", None, None);
    assert_eq!(types(&out), vec![LineType::Character, LineType::Dialogue]);
    assert_eq!(out[0].confidence_tier, ConfidenceTier::High);
}

#[test]
fn full_scene_resolves_every_role() {
    let out = classify(SCENE, None, None);
    use LineType::*;
    assert_eq!(
        types(&out),
        vec![
            Invocation, Blank, HeadingFull, Action, Blank, Character, Parenthetical, Dialogue,
            Blank, Character, Dialogue, Blank, Action, Blank, Transition, Blank,
            HeadingNumberOnly, HeadingDetail, Action,
        ]
    );
}

#[test]
fn invocation_is_certain_in_every_spelling() {
    for line in [
        "بسم الله الرحمن الرحيم",
        "﴿بسم الله الرحمن الرحيم﴾",
        "{ بسم الله الرحمن الرحيم }",
        "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ",
    ] {
        let out = classify(line, None, None);
        assert_eq!(out[0].line_type, LineType::Invocation, "{line}");
        assert_eq!(out[0].confidence_tier, ConfidenceTier::High);
        assert_eq!(out[0].doubt_score, 0.0);
    }
}

#[test]
fn heading_start_always_consumes_and_leads_with_full_unit() {
    let vocab = Vocabulary::builtin();
    let parser = SceneHeaderParser::new(&vocab);
    let memory = DocumentMemory::new();
    for doc in [
        "مشهد 1",
        "مشهد 4 - داخلي - المطبخ - نهار\nتجلس سارة",
        "المشهد رقم 12\nالحديقة\nنهار",
        "scene 3 - ext - garden - night",
        "مشهد ٧ - ليل\nالمستشفى",
    ] {
        let lines: Vec<&str> = doc.lines().collect();
        let header = parser.parse(&lines, 0, &memory).expect(doc);
        assert!(header.consumed_line_count >= 1, "{doc}");
        assert_eq!(header.units()[0].line_type, LineType::HeadingFull, "{doc}");
    }
    assert!(parser.parse(&["يدخل أحمد"], 0, &memory).is_none());
}

#[test]
fn classification_is_idempotent_with_fresh_memory() {
    let classifier = Classifier::default();
    let a = classifier.classify(SCENE, &[], &mut DocumentMemory::new(), None);
    let b = classifier.classify(SCENE, &[], &mut DocumentMemory::new(), None);
    assert_eq!(types(&a), types(&b));
    assert_eq!(a, b);
}

#[test]
fn parenthetical_shape_after_action_is_certain() {
    for doc in [
        "يدخل أحمد إلى الغرفة.\n(يدخل أحمد إلى الغرفة ببطء شديد ثم يجلس)",
        "يدخل أحمد إلى الغرفة.\n(صوت المطر في الخارج)",
    ] {
        let out = classify(doc, None, None);
        assert_eq!(out.len(), 2, "{doc}");
        assert_eq!(out[0].line_type, LineType::Action, "{doc}");

        let aside = &out[1];
        assert_eq!(aside.line_type, LineType::Parenthetical, "{doc}");
        assert_eq!(aside.confidence, 100.0, "{doc}");
        assert_eq!(aside.doubt_score, 0.0, "{doc}");
        assert!(!aside.needs_review, "{doc}");
    }
}

#[test]
fn memory_grows_from_character_lines() {
    let mut memory = DocumentMemory::new();
    classify(SCENE, None, Some(&mut memory));
    assert_eq!(memory.is_known_character("سارة"), KnownConfidence::Medium);
    assert!(memory.is_known_place("المطبخ") > KnownConfidence::Unknown);

    for _ in 0..3 {
        memory.add_character("ليلى", AddConfidence::High);
    }
    assert_eq!(memory.is_known_character("ليلى"), KnownConfidence::High);
}

#[test]
fn known_name_without_colon_reads_as_character() {
    let mut memory = DocumentMemory::new();
    memory.add_character("سارة", AddConfidence::High);
    memory.add_character("سارة", AddConfidence::High);
    let out = classify("تدخل سارة الغرفة.\nسارة\nأين كنت طوال الليل؟", None, Some(&mut memory));
    assert_eq!(out[1].line_type, LineType::Character);
    assert_eq!(out[2].line_type, LineType::Dialogue);
}

#[test]
fn repeated_corrections_lower_the_wrong_score() {
    let engine = ScoringEngine::default();
    let lines = ["سارة", "أين كنت طوال الليل؟"];
    let prev = [LineType::Action];
    let ctx = ContextBuilder::default().build(&lines, 0, &prev);
    let memory = DocumentMemory::new();

    let character_score =
        |learner: Option<&AdaptiveWeights>| match engine.score(&ctx, &memory, learner) {
            LineEvidence::Contested { scores } => scores[&LineType::Character].score,
            other => panic!("unexpected {other:?}"),
        };

    let unweighted = character_score(None);
    assert!(unweighted > 0.0);

    let mut learner = AdaptiveWeights::new();
    for text in ["سارة", "عمر"] {
        learner.record_correction(
            text,
            LineType::Character,
            LineType::Action,
            Some(LineType::Action),
        );
    }
    assert!(character_score(Some(&learner)) < unweighted);
}

#[test]
fn place_under_heading_is_not_a_speaker() {
    let out = classify("مشهد 9\nفي المقهى\nيجلس عمر وحيداً.", None, None);
    assert_eq!(out[0].line_type, LineType::HeadingNumberOnly);
    assert!(out[1].line_type.is_heading(), "got {}", out[1].line_type);
    assert_eq!(out[2].line_type, LineType::Action);
}
