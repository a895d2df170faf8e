use crate::core::cells::{normalize_code, read_string};
use crate::domain::model::{Course, CourseGroup, Grid};
use serde::{Deserialize, Serialize};

/// Columns of the course list sheet: a category title opens a block and each following
/// row lists one course code and its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseListLayout {
    pub category: usize,
    pub code: usize,
    pub name: usize,
    /// Entries in the code column starting with one of these are notes, not courses.
    pub note_prefixes: Vec<String>,
}

impl Default for CourseListLayout {
    fn default() -> Self {
        Self {
            category: 0,
            code: 1,
            name: 2,
            note_prefixes: vec!["$".to_string(), "Photo/Video Equipment Room".to_string()],
        }
    }
}

impl CourseListLayout {
    fn is_note(&self, entry: &str) -> bool {
        self.note_prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| entry.starts_with(p.as_str()))
    }
}

/// 依序掃描課程清單；重複出現的類別標題會清空先前的內容但保留原本位置
pub fn extract_course_catalog(grid: &Grid, layout: &CourseListLayout) -> Vec<CourseGroup> {
    let mut groups: Vec<CourseGroup> = Vec::new();
    let mut current: Option<usize> = None;

    for row in 0..grid.row_count() {
        let title = read_string(grid, row, layout.category);
        if !title.is_empty() {
            let idx = match groups.iter().position(|g| g.category == title) {
                Some(idx) => {
                    tracing::debug!("Course category '{}' listed again; restarting it", title);
                    groups[idx].courses.clear();
                    groups[idx].notes.clear();
                    idx
                }
                None => {
                    groups.push(CourseGroup {
                        category: title,
                        courses: Vec::new(),
                        notes: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            current = Some(idx);
        }

        let entry = read_string(grid, row, layout.code);
        let Some(idx) = current.filter(|_| !entry.is_empty()) else {
            continue;
        };

        if layout.is_note(&entry) {
            groups[idx].notes.push(entry);
        } else {
            groups[idx].courses.push(Course {
                code: normalize_code(&entry),
                name: read_string(grid, row, layout.name),
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> CourseListLayout {
        CourseListLayout::default()
    }

    #[test]
    fn test_courses_and_notes_per_category() {
        let grid = Grid::from_text_rows(vec![
            vec!["Printmaking (0506)", "FNAR 2610", "Intro to Printmaking"],
            vec!["", "FNAR 3610", "Screenprinting"],
            vec!["", "$40 per student lab fee", ""],
            vec!["Visiting Lectures (0050)", "", ""],
            vec!["", "Photo/Video Equipment Room", ""],
            vec!["", "FNAR 5010", ""],
        ]);

        let groups = extract_course_catalog(&grid, &layout());
        assert_eq!(groups.len(), 2);

        let print = &groups[0];
        assert_eq!(print.category, "Printmaking (0506)");
        assert_eq!(
            print.courses,
            vec![
                Course {
                    code: "FNAR 2610".to_string(),
                    name: "Intro to Printmaking".to_string()
                },
                Course {
                    code: "FNAR 3610".to_string(),
                    name: "Screenprinting".to_string()
                },
            ]
        );
        assert_eq!(print.notes, vec!["$40 per student lab fee".to_string()]);

        let lectures = &groups[1];
        assert_eq!(lectures.notes, vec!["Photo/Video Equipment Room".to_string()]);
        assert_eq!(lectures.courses[0].code, "FNAR 5010");
        assert_eq!(lectures.courses[0].name, "");
    }

    #[test]
    fn test_rows_before_first_category_are_skipped() {
        let grid = Grid::from_text_rows(vec![
            vec!["", "FNAR 1000", "Orphan"],
            vec!["Senior Seminar (0592)", "4010.0", "Senior Seminar"],
        ]);

        let groups = extract_course_catalog(&grid, &layout());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].courses.len(), 1);
        assert_eq!(groups[0].courses[0].code, "4010");
    }

    #[test]
    fn test_repeated_category_restarts_in_place() {
        let grid = Grid::from_text_rows(vec![
            vec!["Printmaking (0506)", "FNAR 2610", "Old listing"],
            vec!["Ceramics (0508)", "FNAR 2410", "Wheel"],
            vec!["Printmaking (0506)", "FNAR 3610", "New listing"],
        ]);

        let groups = extract_course_catalog(&grid, &layout());
        let names: Vec<&str> = groups.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(names, vec!["Printmaking (0506)", "Ceramics (0508)"]);
        assert_eq!(groups[0].courses.len(), 1);
        assert_eq!(groups[0].courses[0].name, "New listing");
    }

    #[test]
    fn test_custom_note_prefixes() {
        let grid = Grid::from_text_rows(vec![
            vec!["Foundry (0612)", "see budget memo", ""],
            vec!["", "$1,200 bronze", ""],
        ]);
        let custom = CourseListLayout {
            note_prefixes: vec!["see ".to_string()],
            ..CourseListLayout::default()
        };

        let groups = extract_course_catalog(&grid, &custom);
        assert_eq!(groups[0].notes, vec!["see budget memo".to_string()]);
        assert_eq!(groups[0].courses[0].code, "$1,200 bronze");
    }
}
