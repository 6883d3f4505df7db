//! Compile rule text and show how nesting and priority order resolve.

use circ_rules::{compile, Criteria, Location, PolicyKind};

const RULES: &str = "\
priority: t, s, c, b, a, m, g
fallback-policy: l loan-default r request-default n notice-default o fine-default i lost-default

# Everything held at the main library
c main-library: n notice-main
    # Books there, and reserve books in particular
    m book: l loan-book
        t reserve: l loan-reserve r request-none

# Faculty anywhere
g faculty: l loan-faculty
";

fn main() {
    let rules = match compile(RULES) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };
    println!("{rules}");
    for line in rules.lines() {
        let conditions: Vec<String> = line.conditions().iter().map(ToString::to_string).collect();
        println!(
            "  line {:>2} depth {}: {} => {}",
            line.line(),
            line.depth(),
            conditions.join(" + "),
            line.policies()
        );
    }

    let main_library = Location::new("main-floor", "main-library", "campus", "institution");
    let branch = Location::new("branch-floor", "branch-library", "campus", "institution");

    let cases = [
        ("book", "reserve", "faculty", main_library.clone()),
        ("book", "normal", "faculty", main_library.clone()),
        ("dvd", "normal", "faculty", main_library),
        ("book", "reserve", "undergrad", branch),
    ];
    for (item, loan, group, location) in cases {
        let criteria = Criteria::new(item, loan, group, location.clone());
        let best = rules.match_best(&criteria);
        println!(
            "\n{item}/{loan}/{group} at {}: loan {} notice {} (line {})",
            location.library,
            best.policies().get(PolicyKind::Loan),
            best.policies().get(PolicyKind::Notice),
            best.line()
        );
        for candidate in rules.match_all(&criteria) {
            println!("    {candidate}");
        }
    }
}
