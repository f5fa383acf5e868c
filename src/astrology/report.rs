//! Fixed-layout natal chart report.

use super::{house_name, CelestialBody, Chart};

/// Render the chart as the classic two-table text report. Pure and
/// deterministic: the same chart always yields byte-identical text.
pub fn format_report(subject: &str, chart: &Chart) -> String {
    let mut output = String::from("\n");
    output.push_str(&format!("NAME: {}\n", subject));
    output.push_str("PLANET     POSITION\n");
    output.push_str("                      \n");

    for body in CelestialBody::ALL {
        if let Some(position) = chart.position(body) {
            output.push_str(&format!(
                "{:<11}{} {:.3} in {}\n",
                format!("{}:", body.name()),
                position.sign,
                position.degree,
                house_name(position.house),
            ));
        }
    }

    output.push_str("\nHOUSES\n");
    for number in 1..=12u8 {
        if let Some(cusp) = chart.cusp(number) {
            let label = match number {
                1 => "House Cusp 1 (Ascendant):".to_string(),
                4 => "House Cusp 4 (IC):".to_string(),
                7 => "House Cusp 7 (Descendant):".to_string(),
                10 => "House Cusp 10 (Midheaven):".to_string(),
                n => format!("House Cusp {}:", n),
            };
            output.push_str(&format!("{:<30}{}  {:.3}\n", label, cusp.sign, cusp.degree));
        }
    }

    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::astrology::{BodyPosition, HouseCusp, ZodiacSign};

    fn sample_chart() -> Chart {
        let positions = CelestialBody::ALL
            .iter()
            .enumerate()
            .map(|(i, &body)| BodyPosition {
                body,
                sign: ZodiacSign::ALL[i],
                degree: 10.0 + i as f64 + 0.12345,
                house: (i as u8 % 12) + 1,
            })
            .collect();
        let cusps = (1..=12u8)
            .map(|number| HouseCusp {
                number,
                sign: ZodiacSign::ALL[(number as usize - 1) % 12],
                degree: f64::from(number) + 0.5,
            })
            .collect();
        Chart { positions, cusps }
    }

    #[test]
    fn report_names_the_subject() {
        let report = format_report("User", &sample_chart());
        assert!(report.starts_with("\nNAME: User\n"));
        assert!(report.contains("PLANET     POSITION"));
    }

    #[test]
    fn planet_lines_round_to_three_decimals() {
        let report = format_report("User", &sample_chart());
        assert!(report.contains("Sun:       Aries 10.123 in First House"));
        assert!(report.contains("Pluto:     Capricorn 19.123 in Tenth House"));
    }

    #[test]
    fn house_lines_carry_the_axis_names() {
        let report = format_report("User", &sample_chart());
        assert!(report.contains("House Cusp 1 (Ascendant):     Aries  1.500"));
        assert!(report.contains("House Cusp 4 (IC):            Cancer  4.500"));
        assert!(report.contains("House Cusp 7 (Descendant):    Libra  7.500"));
        assert!(report.contains("House Cusp 10 (Midheaven):    Capricorn  10.500"));
        // Plain cusps stay unlabeled.
        assert!(report.contains("House Cusp 2:                 Taurus  2.500"));
        assert!(report.contains("House Cusp 12:                Pisces  12.500"));
    }

    #[test]
    fn report_is_deterministic() {
        let chart = sample_chart();
        assert_eq!(format_report("User", &chart), format_report("User", &chart));
    }
}
