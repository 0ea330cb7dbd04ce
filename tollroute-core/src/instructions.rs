//! Portuguese turn-by-turn instructions built from routing-engine maneuvers.

use serde::{Deserialize, Serialize};

use crate::assets::AssetUrls;
use crate::geometry::LatLng;

/// Kind of maneuver reported by the routing engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverKind {
    /// Start of the route.
    Depart,
    /// Turn at an intersection.
    Turn,
    /// Road name changes.
    NewName,
    /// Continue on the same road.
    Continue,
    /// Enter a roundabout.
    Roundabout,
    /// Enter a large rotary.
    Rotary,
    /// Leave a roundabout or rotary.
    ExitRoundabout,
    /// The road ends.
    EndOfRoad,
    /// The road forks.
    Fork,
    /// Join a motorway.
    OnRamp,
    /// Leave a motorway.
    OffRamp,
    /// Merge into traffic.
    Merge,
    /// End of the route.
    Arrive,
    /// Anything else, kept verbatim.
    Other(String),
}

impl ManeuverKind {
    /// Parse a maneuver type; spaces and underscores are interchangeable.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let normalised = raw.trim().to_lowercase().replace(' ', "_");
        match normalised.as_str() {
            "depart" => Self::Depart,
            "turn" => Self::Turn,
            "new_name" => Self::NewName,
            "continue" => Self::Continue,
            "roundabout" | "roundabout_turn" => Self::Roundabout,
            "rotary" => Self::Rotary,
            "exit_roundabout" | "exit_rotary" => Self::ExitRoundabout,
            "end_of_road" => Self::EndOfRoad,
            "fork" => Self::Fork,
            "on_ramp" => Self::OnRamp,
            "off_ramp" => Self::OffRamp,
            "merge" => Self::Merge,
            "arrive" => Self::Arrive,
            _ => Self::Other(raw.trim().to_lowercase()),
        }
    }
}

/// Direction hint attached to a maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// Left.
    Left,
    /// Right.
    Right,
    /// Sharp left.
    SharpLeft,
    /// Sharp right.
    SharpRight,
    /// Slight left.
    SlightLeft,
    /// Slight right.
    SlightRight,
    /// Straight on.
    Straight,
    /// U-turn.
    Uturn,
    /// No hint.
    #[default]
    None,
}

impl Modifier {
    /// Parse a modifier; spaces and underscores are interchangeable.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace(' ', "_").as_str() {
            "left" => Self::Left,
            "right" => Self::Right,
            "sharp_left" => Self::SharpLeft,
            "sharp_right" => Self::SharpRight,
            "slight_left" => Self::SlightLeft,
            "slight_right" => Self::SlightRight,
            "straight" => Self::Straight,
            "uturn" => Self::Uturn,
            _ => Self::None,
        }
    }
}

/// One routing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    /// Kind of maneuver.
    pub kind: ManeuverKind,
    /// Direction hint.
    pub modifier: Modifier,
    /// Name of the road taken; may be empty.
    pub street_name: String,
    /// Where the maneuver happens.
    pub location: LatLng,
}

/// Rendered instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Portuguese text.
    pub text: String,
    /// Icon URL, empty when no icon applies.
    pub img: String,
}

/// Portuguese text for a maneuver.
///
/// # Examples
///
/// ```
/// use tollroute_core::geometry::LatLng;
/// use tollroute_core::instructions::{translate, Maneuver, ManeuverKind, Modifier};
///
/// let step = Maneuver {
///     kind: ManeuverKind::Turn,
///     modifier: Modifier::SlightLeft,
///     street_name: "Rua Augusta".to_owned(),
///     location: LatLng::default(),
/// };
/// assert_eq!(translate(&step), "Vire suavemente à esquerda na Rua Augusta");
/// ```
#[must_use]
pub fn translate(maneuver: &Maneuver) -> String {
    let street = maneuver.street_name.trim();
    let with = |base: &str, joiner: &str| {
        if street.is_empty() {
            base.to_owned()
        } else {
            format!("{base}{joiner}{street}")
        }
    };
    let either = |named: &str, bare: &str| {
        if street.is_empty() {
            bare.to_owned()
        } else {
            format!("{named}{street}")
        }
    };

    match &maneuver.kind {
        ManeuverKind::Depart => with("Inicie sua viagem", " na "),
        ManeuverKind::Turn => translate_turn(maneuver.modifier, street),
        ManeuverKind::NewName | ManeuverKind::Continue => {
            either("Continue na ", "Continue em frente")
        }
        ManeuverKind::Roundabout | ManeuverKind::Rotary => {
            with("Na rotatória, pegue a primeira saída", " para a ")
        }
        ManeuverKind::ExitRoundabout => with("Saia da rotatória", " em direção à "),
        ManeuverKind::EndOfRoad => either(
            "No final da estrada, siga para a ",
            "No final da estrada, siga em frente",
        ),
        ManeuverKind::Fork => either(
            "Na bifurcação, siga em direção à ",
            "Na bifurcação, siga em frente",
        ),
        ManeuverKind::OnRamp => with("Pegue a rampa de entrada", " para a "),
        ManeuverKind::OffRamp => with("Pegue a rampa de saída", " para a "),
        ManeuverKind::Merge => either("Faça a fusão para a ", "Faça a fusão com a via"),
        ManeuverKind::Arrive => either("Chegue à ", "Você chegou ao destino"),
        ManeuverKind::Other(raw) => with(&capitalise(raw), " na "),
    }
}

fn translate_turn(modifier: Modifier, street: &str) -> String {
    let base = match modifier {
        Modifier::Left => "Vire à esquerda",
        Modifier::Right => "Vire à direita",
        Modifier::SharpLeft => "Vire fortemente à esquerda",
        Modifier::SharpRight => "Vire fortemente à direita",
        Modifier::SlightLeft => "Vire suavemente à esquerda",
        Modifier::SlightRight => "Vire suavemente à direita",
        Modifier::Uturn => "Faça o retorno",
        Modifier::Straight => "Siga em frente",
        Modifier::None => {
            return if street.is_empty() {
                "Vire".to_owned()
            } else {
                format!("Vire na direção de {street}")
            };
        }
    };
    if street.is_empty() {
        base.to_owned()
    } else {
        format!("{base} na {street}")
    }
}

fn capitalise(raw: &str) -> String {
    let mut chars = raw.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Icon name for an instruction text; first matching rule wins.
#[must_use]
pub fn select_icon(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let has = |needle: &str| lower.contains(needle);
    let bend = has("curva") || has("mantenha-se");

    if bend && has("direita") {
        Some("curva-direita")
    } else if bend && has("esquerda") {
        Some("curva-esquerda")
    } else if has("esquerda") {
        Some("esquerda")
    } else if has("direita") {
        Some("direita")
    } else if ["continue", "siga", "pegue", "fusão", "inicie"]
        .iter()
        .any(|w| has(w))
    {
        Some("reto")
    } else if ["rotatória", "rotatoria", "retorno"].iter().any(|w| has(w)) {
        Some("rotatoria")
    } else if has("voltar") || has("volta") {
        Some("voltar")
    } else if has("vire") {
        Some("direita")
    } else {
        None
    }
}

/// Render a maneuver into text and icon URL.
#[must_use]
pub fn instruction(maneuver: &Maneuver, assets: &AssetUrls) -> Instruction {
    let text = translate(maneuver);
    let img = select_icon(&text).map_or_else(String::new, |icon| assets.icon(icon));
    Instruction { text, img }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn step(kind: &str, modifier: &str, street: &str) -> Maneuver {
        Maneuver {
            kind: ManeuverKind::parse(kind),
            modifier: Modifier::parse(modifier),
            street_name: street.to_owned(),
            location: LatLng::default(),
        }
    }

    #[rstest]
    #[case("depart", "", "BR-116", "Inicie sua viagem na BR-116")]
    #[case("depart", "", "", "Inicie sua viagem")]
    #[case("turn", "sharp right", "", "Vire fortemente à direita")]
    #[case("turn", "uturn", "", "Faça o retorno")]
    #[case("turn", "", "Av. Brasil", "Vire na direção de Av. Brasil")]
    #[case("new name", "", "", "Continue em frente")]
    #[case("continue", "", "SP-330", "Continue na SP-330")]
    #[case("rotary", "", "", "Na rotatória, pegue a primeira saída")]
    #[case("roundabout", "", "Rua A", "Na rotatória, pegue a primeira saída para a Rua A")]
    #[case("exit roundabout", "", "Rua B", "Saia da rotatória em direção à Rua B")]
    #[case("end of road", "", "", "No final da estrada, siga em frente")]
    #[case("fork", "", "BR-381", "Na bifurcação, siga em direção à BR-381")]
    #[case("on ramp", "", "", "Pegue a rampa de entrada")]
    #[case("off_ramp", "", "Marginal", "Pegue a rampa de saída para a Marginal")]
    #[case("merge", "", "", "Faça a fusão com a via")]
    #[case("arrive", "", "", "Você chegou ao destino")]
    #[case("notification", "", "BR-101", "Notification na BR-101")]
    fn translates_maneuvers(
        #[case] kind: &str,
        #[case] modifier: &str,
        #[case] street: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(translate(&step(kind, modifier, street)), expected);
    }

    #[rstest]
    #[case("Mantenha-se à direita", Some("curva-direita"))]
    #[case("Vire à esquerda", Some("esquerda"))]
    #[case("Vire fortemente à direita na BR-116", Some("direita"))]
    #[case("Continue em frente", Some("reto"))]
    #[case("Na rotatória, pegue a primeira saída", Some("reto"))]
    #[case("Faça o retorno", Some("rotatoria"))]
    #[case("Vire", Some("direita"))]
    #[case("Você chegou ao destino", None)]
    fn selects_icons(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(select_icon(text), expected);
    }

    #[rstest]
    fn arrival_has_no_icon() {
        let rendered = instruction(&step("arrive", "", ""), &AssetUrls::default());
        assert!(rendered.img.is_empty());
    }
}
