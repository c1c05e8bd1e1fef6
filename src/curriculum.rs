//! Fixed lookup tables used when prompting for practice problems:
//! grade-band concept guidance, difficulty tiers, and country grade-system
//! notes.

/// Numeric grade for comparisons. "K" is 0; anything unparseable maps to 0.
pub fn grade_to_number(grade: &str) -> u32 {
  if grade == "K" {
    return 0;
  }
  grade.parse::<u32>().unwrap_or(0)
}

/// Math concept guidance for a coarse grade band. Returns an empty string
/// for non-math subjects (the caller decides whether to include it).
pub fn math_concepts_for_grade(grade: &str) -> &'static str {
  match grade_to_number(grade) {
    0..=2 => {
      "\
MATH CONCEPTS FOR THIS GRADE:
- Counting objects (up to 100 for grade 2)
- Basic addition (single digits, sums up to 20)
- Basic subtraction (single digits)
- Skip counting by 2s, 5s, 10s
- Comparing numbers (greater than, less than)
- Simple patterns
- Telling time (hours, half hours)
- Basic shapes recognition"
    }
    3..=4 => {
      "\
MATH CONCEPTS FOR THIS GRADE:
- Multiplication facts (up to 12x12)
- Division with and without remainders
- Simple fractions (1/2, 1/3, 1/4, comparing fractions)
- Adding and subtracting fractions with same denominator
- Multi-digit addition and subtraction (with regrouping)
- Introduction to area and perimeter
- Word problems with multiple steps
- Rounding numbers
- Basic measurement conversions"
    }
    5..=6 => {
      "\
MATH CONCEPTS FOR THIS GRADE:
- All fraction operations (add, subtract, multiply, divide fractions)
- Decimal operations (add, subtract, multiply, divide)
- Converting between fractions, decimals, and percentages
- Area and perimeter of complex shapes (triangles, parallelograms)
- Volume of rectangular prisms and cylinders
- Order of operations (PEMDAS/BODMAS)
- Introduction to negative numbers
- Ratio and proportion
- Mean, median, mode
- Coordinate graphing basics"
    }
    _ => {
      "\
MATH CONCEPTS FOR THIS GRADE:
- Percentages and percentage change (discounts, interest, tax)
- Ratios and proportional reasoning
- Basic algebra (solving for x, simplifying expressions)
- Linear equations and graphing
- Geometry (angle relationships, triangle properties, circle calculations)
- Probability and statistics
- Exponents and scientific notation
- Pythagorean theorem
- Systems of equations (basic)
- Surface area and volume of 3D shapes"
    }
  }
}

/// Narrative descriptor for one of the five difficulty tiers. Out-of-range
/// values fall back to tier 3.
pub fn difficulty_description(difficulty: u8) -> &'static str {
  match difficulty {
    1 => "Difficulty 1/5: Easy but engaging - basic concepts with straightforward application. Should still require some thinking.",
    2 => "Difficulty 2/5: Moderate - requires understanding of concepts and 1-2 step problem solving. Not trivial.",
    4 => "Difficulty 4/5: Hard - complex problems that push the boundaries of grade-level understanding.",
    5 => "Difficulty 5/5: Very challenging - problems at the edge of or slightly beyond grade level. Requires advanced reasoning.",
    _ => "Difficulty 3/5: Challenging - multi-step problems requiring careful reasoning. Should make the child think hard.",
  }
}

/// Short note describing a country's grade system, so problems reference
/// school conventions the kid actually knows. Unknown countries get a
/// US-equivalent note.
pub fn grade_system_note(country_code: &str) -> &'static str {
  match country_code {
    "US" => "US grades K-12 system",
    "GB" => "UK system: Reception, Years 1-13. Year 1 ≈ US Grade K, Year 7 ≈ US Grade 6",
    "CA" => "Canadian grades similar to US K-12 system",
    "AU" => "Australian system: Prep/Foundation, Years 1-12",
    "IN" => "Indian system: Classes/Standards 1-12, LKG/UKG for kindergarten",
    "SG" => "Singapore: Primary 1-6, Secondary 1-4",
    "NZ" => "NZ: Years 1-13, Year 1 starts at age 5",
    "IE" => "Irish system: Junior/Senior Infants, 1st-6th class (primary), 1st-6th year (secondary)",
    "PH" => "Philippine K-12 system similar to US",
    "ZA" => "South African Grades R-12 (R = Reception)",
    _ => "Using US grade equivalents as reference",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn kindergarten_and_garbage_grades_map_to_zero() {
    assert_eq!(grade_to_number("K"), 0);
    assert_eq!(grade_to_number("nope"), 0);
    assert_eq!(grade_to_number("7"), 7);
  }

  #[test]
  fn concept_bands_cover_all_grades() {
    assert!(math_concepts_for_grade("K").contains("Counting objects"));
    assert!(math_concepts_for_grade("3").contains("Multiplication facts"));
    assert!(math_concepts_for_grade("6").contains("Order of operations"));
    assert!(math_concepts_for_grade("12").contains("Pythagorean theorem"));
  }

  #[test]
  fn unknown_difficulty_falls_back_to_middle_tier() {
    assert!(difficulty_description(0).starts_with("Difficulty 3/5"));
    assert!(difficulty_description(5).starts_with("Difficulty 5/5"));
  }

  #[test]
  fn unknown_country_gets_us_equivalent_note() {
    assert_eq!(grade_system_note("FR"), "Using US grade equivalents as reference");
    assert!(grade_system_note("SG").contains("Primary 1-6"));
  }
}
