//! Turns a raw payload into one internal shape.
//!
//! Lessons resolve their slides through an explicit [`ContentFormat`]: the
//! payload's own `format`, else the caller's version hint. The tagged source is
//! tried first, then the fixed fallback order
//! `slides > sections > points`. The first source yielding at least one slide wins.

use std::str::FromStr;

use assess_core::model::{
    ActivityDefinition, ActivityId, ActivityKind, AnswerOption, OptionId, ScoringParams, Unit,
    UnitId,
};

use super::payload::{
    ContentFormat, RawActivity, RawBody, RawLesson, RawPuzzle, RawQuiz, RawSections, RawSlide,
};
use crate::error::ContentError;

/// Slides produced from a flat point list when the payload does not say otherwise.
pub const DEFAULT_SLIDE_COUNT: usize = 3;

struct SlideDraft {
    heading: Option<String>,
    points: Vec<String>,
}

/// Decodes and normalizes an activity payload.
///
/// # Errors
///
/// Returns `ContentError::Malformed` for undecodable JSON or blank ids,
/// `ContentError::Empty` when no units survive normalization, and
/// `ContentError::Invalid` when the result breaks a definition invariant.
pub fn decode_activity(
    bytes: &[u8],
    hint: Option<ContentFormat>,
) -> Result<ActivityDefinition, ContentError> {
    let raw: RawActivity =
        serde_json::from_slice(bytes).map_err(|e| ContentError::Malformed(e.to_string()))?;
    normalize(raw, hint)
}

fn normalize(raw: RawActivity, hint: Option<ContentFormat>) -> Result<ActivityDefinition, ContentError> {
    let id = parse_id::<ActivityId>(&raw.id)?;
    let (kind, units) = match raw.body {
        RawBody::Lesson(lesson) => (ActivityKind::Lesson, lesson_units(lesson, hint)),
        RawBody::Quiz(quiz) => (ActivityKind::Quiz, quiz_units(quiz)?),
        RawBody::Puzzle(puzzle) => (ActivityKind::Puzzle, puzzle_units(puzzle)?),
    };
    if units.is_empty() {
        return Err(ContentError::Empty);
    }

    Ok(ActivityDefinition::new(
        id,
        raw.title.trim(),
        kind,
        units,
        ScoringParams {
            pass_threshold: raw.pass_threshold,
        },
        raw.duration_secs,
    )?)
}

fn lesson_units(lesson: RawLesson, hint: Option<ContentFormat>) -> Vec<Unit> {
    let preferred = lesson.format.or(hint);
    let chain = preferred
        .into_iter()
        .chain(ContentFormat::FALLBACK.into_iter().filter(|f| Some(*f) != preferred));

    for format in chain {
        let drafts = match format {
            ContentFormat::Slides => structured(&lesson.slides),
            ContentFormat::Sections => sectioned(&lesson.sections),
            ContentFormat::Points => partitioned(&lesson.points, lesson.slide_count),
        };
        if !drafts.is_empty() {
            return drafts
                .into_iter()
                .enumerate()
                .map(|(i, draft)| {
                    Unit::slide(UnitId::new(format!("slide-{}", i + 1)), draft.heading, draft.points)
                })
                .collect();
        }
    }
    Vec::new()
}

fn clean_points(points: &[String]) -> Vec<String> {
    points
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

fn structured(slides: &[RawSlide]) -> Vec<SlideDraft> {
    slides
        .iter()
        .filter_map(|slide| {
            let points = clean_points(&slide.points);
            (!points.is_empty()).then(|| SlideDraft {
                heading: slide
                    .title
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned),
                points,
            })
        })
        .collect()
}

fn sectioned(sections: &RawSections) -> Vec<SlideDraft> {
    [
        ("Do", &sections.dos),
        ("Don't", &sections.donts),
        ("Checklist", &sections.checklist),
        ("Reflection", &sections.reflection),
    ]
    .into_iter()
    .filter_map(|(heading, points)| {
        let points = clean_points(points);
        (!points.is_empty()).then(|| SlideDraft {
            heading: Some(heading.to_owned()),
            points,
        })
    })
    .collect()
}

/// Splits a flat list into `slide_count` groups whose sizes differ by at most one,
/// larger groups first. Order is preserved; nothing is dropped or repeated.
fn partitioned(points: &[String], slide_count: Option<usize>) -> Vec<SlideDraft> {
    let points = clean_points(points);
    if points.is_empty() {
        return Vec::new();
    }
    let groups = slide_count
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SLIDE_COUNT)
        .min(points.len());
    let base = points.len() / groups;
    let extra = points.len() % groups;

    let mut rest = points.into_iter();
    (0..groups)
        .map(|i| {
            let size = base + usize::from(i < extra);
            SlideDraft {
                heading: None,
                points: rest.by_ref().take(size).collect(),
            }
        })
        .collect()
}

fn quiz_units(quiz: RawQuiz) -> Result<Vec<Unit>, ContentError> {
    quiz.questions
        .into_iter()
        .map(|question| {
            let options = question
                .options
                .into_iter()
                .map(|option| {
                    Ok(AnswerOption {
                        id: parse_id::<OptionId>(&option.id)?,
                        text: option.text,
                    })
                })
                .collect::<Result<Vec<_>, ContentError>>()?;
            Ok(Unit::question(
                parse_id::<UnitId>(&question.id)?,
                question.prompt,
                options,
            ))
        })
        .collect()
}

fn puzzle_units(puzzle: RawPuzzle) -> Result<Vec<Unit>, ContentError> {
    puzzle
        .steps
        .into_iter()
        .map(|step| Ok(Unit::step(parse_id::<UnitId>(&step.id)?, step.text)))
        .collect()
}

fn parse_id<T>(raw: &str) -> Result<T, ContentError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| ContentError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::model::{ActivityError, UnitBody};

    fn slides(definition: &ActivityDefinition) -> Vec<(Option<String>, Vec<String>)> {
        definition
            .units()
            .iter()
            .map(|unit| match unit.body() {
                UnitBody::Slide(slide) => (slide.heading.clone(), slide.points.clone()),
                other => panic!("expected slide, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn nine_flat_points_become_three_slides() {
        let json = br#"{"id":"l1","title":"Git basics","kind":"lesson","format":"v1",
            "points":["p1","p2","p3","p4","p5","p6","p7","p8","p9"]}"#;
        let definition = decode_activity(json, None).unwrap();

        let slides = slides(&definition);
        assert_eq!(slides.len(), 3);
        for (i, (_, points)) in slides.iter().enumerate() {
            let expected: Vec<String> = (1..=3).map(|n| format!("p{}", i * 3 + n)).collect();
            assert_eq!(points, &expected);
        }
        assert_eq!(definition.units()[2].id().as_str(), "slide-3");
    }

    #[test]
    fn uneven_flat_list_keeps_every_point() {
        let json = br#"{"id":"l1","kind":"lesson","slide_count":3,
            "points":["a","b","c","d","e","f","g","h","i","j"]}"#;
        let definition = decode_activity(json, None).unwrap();

        let sizes: Vec<_> = slides(&definition).iter().map(|(_, p)| p.len()).collect();
        assert_eq!(sizes, [4, 3, 3]);
        let flat: Vec<_> = slides(&definition).into_iter().flat_map(|(_, p)| p).collect();
        assert_eq!(flat, ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
    }

    #[test]
    fn fewer_points_than_slides() {
        let json = br#"{"id":"l1","kind":"lesson","points":["only", "two"]}"#;
        let definition = decode_activity(json, None).unwrap();
        assert_eq!(definition.units().len(), 2);
    }

    #[test]
    fn structured_slides_win_over_other_sources() {
        let json = br#"{"id":"l1","kind":"lesson",
            "slides":[{"title":"Intro","points":["hello"]},{"points":["  ","world"]}],
            "sections":{"do":["commit often"]},
            "points":["x","y","z"]}"#;
        let definition = decode_activity(json, None).unwrap();
        assert_eq!(
            slides(&definition),
            [
                (Some("Intro".to_string()), vec!["hello".to_string()]),
                (None, vec!["world".to_string()]),
            ]
        );
    }

    #[test]
    fn sections_win_over_flat_points() {
        let json = br#"{"id":"l1","kind":"lesson",
            "sections":{"do":["commit often"],"dont":["force push"],"reflection":["why?"]},
            "points":["x","y","z"]}"#;
        let definition = decode_activity(json, None).unwrap();
        let headings: Vec<_> = slides(&definition).into_iter().map(|(h, _)| h).collect();
        assert_eq!(
            headings,
            [
                Some("Do".to_string()),
                Some("Don't".to_string()),
                Some("Reflection".to_string()),
            ]
        );
    }

    #[test]
    fn explicit_format_is_tried_first() {
        let json = br#"{"id":"l1","kind":"lesson","format":"points",
            "slides":[{"points":["structured"]}],
            "points":["flat"]}"#;
        let definition = decode_activity(json, None).unwrap();
        assert_eq!(slides(&definition), [(None, vec!["flat".to_string()])]);
    }

    #[test]
    fn hint_applies_only_without_payload_format() {
        let json = br#"{"id":"l1","kind":"lesson",
            "sections":{"checklist":["tests pass"]},
            "points":["flat"]}"#;
        let hinted = decode_activity(json, Some(ContentFormat::Points)).unwrap();
        assert_eq!(slides(&hinted), [(None, vec!["flat".to_string()])]);

        let tagged = br#"{"id":"l1","kind":"lesson","format":"sections",
            "sections":{"checklist":["tests pass"]},
            "points":["flat"]}"#;
        let definition = decode_activity(tagged, Some(ContentFormat::Points)).unwrap();
        assert_eq!(
            slides(&definition),
            [(Some("Checklist".to_string()), vec!["tests pass".to_string()])]
        );
    }

    #[test]
    fn empty_tagged_source_falls_back() {
        let json = br#"{"id":"l1","kind":"lesson","format":"slides","points":["a"]}"#;
        let definition = decode_activity(json, None).unwrap();
        assert_eq!(definition.units().len(), 1);
    }

    #[test]
    fn lesson_without_content_is_unavailable() {
        let json = br#"{"id":"l1","kind":"lesson","points":["   "],"slides":[]}"#;
        assert!(matches!(decode_activity(json, None), Err(ContentError::Empty)));
    }

    #[test]
    fn quiz_drops_any_correctness_hint() {
        let json = br#"{"id":"q1","kind":"quiz","pass_threshold":70,"questions":[
            {"id":"q1","prompt":"2+2?","options":[
                {"id":"a","text":"3","correct":false},
                {"id":"b","text":"4","correct":true}]}]}"#;
        let definition = decode_activity(json, None).unwrap();

        assert_eq!(definition.kind(), ActivityKind::Quiz);
        assert_eq!(definition.scoring().pass_threshold, Some(70));
        let question = definition.units()[0].as_question().unwrap();
        assert_eq!(question.options.len(), 2);
        let serialized = serde_json::to_string(&definition).unwrap();
        assert!(!serialized.contains("correct"));
    }

    #[test]
    fn puzzle_keeps_server_shuffled_order() {
        let json = br#"{"id":"p1","kind":"puzzle","steps":[
            {"id":"c","text":"push"},{"id":"a","text":"add"},{"id":"b","text":"commit"}]}"#;
        let definition = decode_activity(json, None).unwrap();
        let ids: Vec<_> = definition.units().iter().map(|u| u.id().as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn empty_quiz_is_unavailable() {
        let json = br#"{"id":"q1","kind":"quiz","questions":[]}"#;
        assert!(matches!(decode_activity(json, None), Err(ContentError::Empty)));
    }

    #[test]
    fn question_without_options_is_invalid() {
        let json = br#"{"id":"q1","kind":"quiz","questions":[{"id":"q1","prompt":"?"}]}"#;
        assert!(matches!(
            decode_activity(json, None),
            Err(ContentError::Invalid(ActivityError::NoOptions(_)))
        ));
    }

    #[test]
    fn blank_ids_and_bad_json_are_malformed() {
        let blank = br#"{"id":"p1","kind":"puzzle","steps":[{"id":" ","text":"x"}]}"#;
        assert!(matches!(
            decode_activity(blank, None),
            Err(ContentError::Malformed(_))
        ));
        assert!(matches!(
            decode_activity(b"{not json", None),
            Err(ContentError::Malformed(_))
        ));
        assert!(matches!(
            decode_activity(br#"{"id":"x","kind":"video"}"#, None),
            Err(ContentError::Malformed(_))
        ));
    }
}
