//! Built-in scraping profiles.

use crate::types::{FieldSpec, Profile};

/// Name of the gym directory profile.
pub const GYMS_PROFILE: &str = "gyms";

/// Name of the JavaScript course catalogue profile.
pub const JS_COURSES_PROFILE: &str = "javascript-courses";

/// All profiles shipped with the binary.
pub fn builtin_profiles() -> Vec<Profile> {
    vec![gyms(), javascript_courses()]
}

/// Gym listings around central Paris.
fn gyms() -> Profile {
    Profile {
        name: GYMS_PROFILE.into(),
        base_url: "https://www.masalledesport.com/recherche?lat=48.8575475&lng=2.3513765&city=Paris"
            .into(),
        css_selector: "[class^='border-b border-gray-300 pb-8']".into(),
        no_results_marker: "Désolés, nous n'avons pas ça sous la main !".into(),
        instruction: "Extract every gym listing with its 'nom', 'adresse', 'description', \
                      'note' and 'lien_annonce' (the numeric listing id found in its link)."
            .into(),
        fields: vec![
            FieldSpec::text("nom", "Name of the gym"),
            FieldSpec::text("adresse", "Full street address"),
            FieldSpec::text("description", "Description of the gym and its services"),
            FieldSpec::text("note", "Average user rating"),
            FieldSpec::integer("lien_annonce", "Unique listing identifier on the site"),
        ],
        dedup_key: "nom".into(),
        output_file: "salles_de_sport_completes.csv".into(),
        page_param: "page".into(),
        start_page: 1,
        max_pages: None,
    }
}

/// JavaScript courses from a course search page.
fn javascript_courses() -> Profile {
    Profile {
        name: JS_COURSES_PROFILE.into(),
        base_url: "https://www.coursera.org/search?query=javascript".into(),
        css_selector: "main li".into(),
        no_results_marker: "No results found".into(),
        instruction: "Extract every JavaScript course with its 'title', 'skills', \
                      'description', 'reviews' and 'rating'."
            .into(),
        fields: vec![
            FieldSpec::text("title", "Course title"),
            FieldSpec::text("skills", "Skills taught"),
            FieldSpec::text("description", "Course description"),
            FieldSpec::text("reviews", "Number of reviews"),
            FieldSpec::text("rating", "Average user rating"),
        ],
        dedup_key: "title".into(),
        output_file: "cours_javascript_completes.csv".into(),
        page_param: "page".into(),
        start_page: 1,
        max_pages: None,
    }
}
