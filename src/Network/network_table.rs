use crate::EOS::eos_api::ThermoState;
use crate::Network::rate_fits::{RateFit, detailed_balance_factors};
use crate::Utils::esum::kahan_sum;
use crate::constants::{M_ELECTRON, M_NEUTRON, M_PROTON, MEV_TO_GRAM};
use log::{info, warn};
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("network '{0}' has no species")]
    NoSpecies(String),
    #[error("species '{name}' is invalid: {reason}")]
    InvalidSpecies { name: String, reason: String },
    #[error("species '{0}' is defined more than once")]
    DuplicateSpecies(String),
    #[error("reaction '{0}' is defined more than once")]
    DuplicateReaction(String),
    #[error("{context} refers to unknown species '{species}'")]
    UnknownSpecies { context: String, species: String },
    #[error("reaction '{reaction}' does not conserve nucleon number (imbalance {imbalance})")]
    MassNotConserved { reaction: String, imbalance: f64 },
    #[error("reaction '{reaction}': {reason}")]
    InvalidReaction { reaction: String, reason: String },
    #[error("composition has {got} entries but the network has {expected} species")]
    CompositionLength { expected: usize, got: usize },
}

fn one() -> f64 {
    1.0
}

fn one_u32() -> u32 {
    1
}

/// A nucleus tracked by the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// mass number
    pub a: f64,
    /// charge
    pub z: f64,
    /// binding energy (MeV)
    pub binding_energy: f64,
    /// partition-function weight used by detailed balance
    #[serde(default = "one")]
    pub spin_weight: f64,
}

impl Species {
    pub fn new(name: &str, a: f64, z: f64, binding_energy: f64) -> Self {
        Species {
            name: name.to_string(),
            a,
            z,
            binding_energy,
            spin_weight: 1.0,
        }
    }

    pub fn with_spin_weight(mut self, spin_weight: f64) -> Self {
        self.spin_weight = spin_weight;
        self
    }

    /// Mass of one nucleus plus its electrons (g).
    pub fn mass(&self) -> f64 {
        (self.a - self.z) * M_NEUTRON + self.z * (M_PROTON + M_ELECTRON)
            - self.binding_energy * MEV_TO_GRAM
    }

    fn validate(&self) -> Result<(), NetworkError> {
        let invalid = |reason: &str| NetworkError::InvalidSpecies {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("empty name"));
        }
        if !(self.a > 0.0) || !self.a.is_finite() {
            return Err(invalid("mass number must be positive"));
        }
        if !(self.z >= 0.0) || self.z > self.a {
            return Err(invalid("charge must lie in [0, A]"));
        }
        if !self.binding_energy.is_finite() {
            return Err(invalid("binding energy must be finite"));
        }
        if !(self.spin_weight > 0.0) || !self.spin_weight.is_finite() {
            return Err(invalid("partition-function weight must be positive"));
        }
        Ok(())
    }
}

/// Grouping used for reporting and for building networks by channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionGroup {
    Capture,
    Photodisintegration,
    Fusion,
    /// lumped chains such as si28 + 7 he4 -> ni56
    Effective,
}

impl ReactionGroup {
    pub const ALL: [ReactionGroup; 4] = [
        ReactionGroup::Capture,
        ReactionGroup::Photodisintegration,
        ReactionGroup::Fusion,
        ReactionGroup::Effective,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ReactionGroup::Capture => "capture",
            ReactionGroup::Photodisintegration => "photodisintegration",
            ReactionGroup::Fusion => "fusion",
            ReactionGroup::Effective => "effective",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCount {
    pub species: String,
    #[serde(default = "one_u32")]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesOrder {
    pub species: String,
    pub order: f64,
}

fn default_group() -> ReactionGroup {
    ReactionGroup::Effective
}

/// Reaction as written in a network description, species referenced by name.
///
/// Exactly one of `rate` and `reverse_of` must be given; `reverse_of` names an earlier
/// reaction whose rate is turned around by detailed balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionSpec {
    pub name: String,
    #[serde(default = "default_group")]
    pub group: ReactionGroup,
    pub reactants: Vec<SpeciesCount>,
    pub products: Vec<SpeciesCount>,
    #[serde(default)]
    pub rate: Option<RateFit>,
    #[serde(default)]
    pub reverse_of: Option<String>,
    /// charge pairs that are screened
    #[serde(default)]
    pub screening: Vec<(f64, f64)>,
    /// kinetic orders when they differ from the reactant counts
    #[serde(default)]
    pub orders: Option<Vec<SpeciesOrder>>,
}

fn counts(list: &[(&str, u32)]) -> Vec<SpeciesCount> {
    list.iter()
        .map(|(species, count)| SpeciesCount {
            species: species.to_string(),
            count: *count,
        })
        .collect()
}

impl ReactionSpec {
    pub fn new(
        name: &str,
        group: ReactionGroup,
        reactants: &[(&str, u32)],
        products: &[(&str, u32)],
    ) -> Self {
        ReactionSpec {
            name: name.to_string(),
            group,
            reactants: counts(reactants),
            products: counts(products),
            rate: None,
            reverse_of: None,
            screening: Vec::new(),
            orders: None,
        }
    }

    pub fn with_rate(mut self, rate: impl Into<RateFit>) -> Self {
        self.rate = Some(rate.into());
        self
    }

    pub fn reverse_of(mut self, forward: &str) -> Self {
        self.reverse_of = Some(forward.to_string());
        self
    }

    pub fn screened(mut self, pairs: &[(f64, f64)]) -> Self {
        self.screening = pairs.to_vec();
        self
    }

    pub fn with_orders(mut self, orders: &[(&str, f64)]) -> Self {
        self.orders = Some(
            orders
                .iter()
                .map(|(species, order)| SpeciesOrder {
                    species: species.to_string(),
                    order: *order,
                })
                .collect(),
        );
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    pub species: Vec<Species>,
    pub reactions: Vec<ReactionSpec>,
}

/// Reaction resolved against the species list.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub name: String,
    pub group: ReactionGroup,
    pub equation: String,
    /// (species index, count)
    pub reactants: Vec<(usize, u32)>,
    pub products: Vec<(usize, u32)>,
    /// (species index, kinetic order) entering the rate
    pub orders: Vec<(usize, f64)>,
    pub rate: RateFit,
    pub screening: Vec<(f64, f64)>,
    /// 1/prod(count!) for identical reactants, 1 with explicit orders
    pub symmetry: f64,
    /// power of the density in the molar rate: sum of orders - 1
    pub density_exponent: f64,
    /// energy release (MeV)
    pub q_value: f64,
    /// net change of each species per reaction event, zero entries left out
    pub net_change: Vec<(usize, f64)>,
}

fn factorial(n: u32) -> f64 {
    (1..=n).map(|k| k as f64).product()
}

/// Immutable description of a reaction network: species, reactions, kinetic orders and
/// the derived quantities every right-hand-side evaluation reuses.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkTable {
    name: String,
    species: Vec<Species>,
    reactions: Vec<Reaction>,
    masses: Vec<f64>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositionSummary {
    pub abar: f64,
    pub zbar: f64,
    pub ye: f64,
}

impl NetworkTable {
    pub fn new(spec: NetworkSpec) -> Result<Self, NetworkError> {
        if spec.species.is_empty() {
            return Err(NetworkError::NoSpecies(spec.name));
        }
        let mut index = HashMap::new();
        for (i, species) in spec.species.iter().enumerate() {
            species.validate()?;
            if index.insert(species.name.clone(), i).is_some() {
                return Err(NetworkError::DuplicateSpecies(species.name.clone()));
            }
        }

        let mut reactions: Vec<Reaction> = Vec::with_capacity(spec.reactions.len());
        for reaction_spec in &spec.reactions {
            if reactions.iter().any(|r| r.name == reaction_spec.name) {
                return Err(NetworkError::DuplicateReaction(reaction_spec.name.clone()));
            }
            let reaction = resolve_reaction(reaction_spec, &spec.species, &index, &reactions)?;
            reactions.push(reaction);
        }

        let masses = spec.species.iter().map(Species::mass).collect();
        info!(
            "network '{}' built: {} species, {} reactions",
            spec.name,
            spec.species.len(),
            reactions.len()
        );
        Ok(NetworkTable {
            name: spec.name,
            species: spec.species,
            reactions,
            masses,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_species(&self) -> usize {
        self.species.len()
    }

    pub fn num_reactions(&self) -> usize {
        self.reactions.len()
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_names(&self) -> Vec<String> {
        self.species.iter().map(|s| s.name.clone()).collect()
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// nuclear masses (g), same order as `species()`
    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn reaction_index(&self, name: &str) -> Option<usize> {
        self.reactions.iter().position(|r| r.name == name)
    }

    pub fn reactions_in_group(&self, group: ReactionGroup) -> impl Iterator<Item = &Reaction> {
        self.reactions.iter().filter(move |r| r.group == group)
    }

    pub fn check_length(&self, xn: &[f64]) -> Result<(), NetworkError> {
        if xn.len() != self.species.len() {
            return Err(NetworkError::CompositionLength {
                expected: self.species.len(),
                got: xn.len(),
            });
        }
        Ok(())
    }

    /// Mass fractions from (name, X) pairs; unlisted species are zero.
    pub fn mass_fractions(&self, pairs: &[(&str, f64)]) -> Result<Vec<f64>, NetworkError> {
        let mut xn = vec![0.0; self.species.len()];
        for (name, x) in pairs {
            let i = self
                .species_index(name)
                .ok_or_else(|| NetworkError::UnknownSpecies {
                    context: "composition".to_string(),
                    species: name.to_string(),
                })?;
            xn[i] = *x;
        }
        Ok(xn)
    }

    /// Y_i = X_i / A_i, no clipping.
    pub fn molar_abundances(&self, xn: &[f64]) -> Vec<f64> {
        self.species
            .iter()
            .zip(xn)
            .map(|(s, &x)| x / s.a)
            .collect()
    }

    /// abar = 1/sum(Y), zbar = abar*sum(Z Y), ye = zbar/abar; negative fractions count as zero.
    pub fn composition(&self, xn: &[f64]) -> CompositionSummary {
        let mut sum_y = 0.0;
        let mut sum_zy = 0.0;
        for (s, &x) in self.species.iter().zip(xn) {
            let y = x.max(0.0) / s.a;
            sum_y += y;
            sum_zy += s.z * y;
        }
        if !(sum_y > 0.0) {
            return CompositionSummary {
                abar: 0.0,
                zbar: 0.0,
                ye: 0.0,
            };
        }
        let abar = 1.0 / sum_y;
        let zbar = abar * sum_zy;
        CompositionSummary {
            abar,
            zbar,
            ye: zbar / abar,
        }
    }

    /// d(abar)/dX_j and d(zbar)/dX_j at the given composition.
    pub fn composition_derivatives(&self, summary: &CompositionSummary) -> (Vec<f64>, Vec<f64>) {
        let abar = summary.abar;
        let zbar = summary.zbar;
        self.species
            .iter()
            .map(|s| (-abar * abar / s.a, abar * (s.z - zbar) / s.a))
            .unzip()
    }

    /// Thermodynamic input state (rho, T, abar, zbar) for the composition `xn`.
    #[allow(non_snake_case)]
    pub fn thermo_state(&self, rho: f64, T: f64, xn: &[f64]) -> ThermoState {
        let summary = self.composition(xn);
        ThermoState::new(rho, T, summary.abar, summary.zbar)
    }

    pub fn pretty_print(&self) {
        let mut table = Table::new();
        table.add_row(row!["reaction", "group", "equation", "Q, MeV", "rate law"]);
        for reaction in &self.reactions {
            let law = match &reaction.rate {
                RateFit::Constant(_) => "constant",
                RateFit::Reaclib(_) => "reaclib",
                RateFit::Tabulated(_) => "tabulated",
            };
            table.add_row(row![
                reaction.name,
                reaction.group.label(),
                reaction.equation,
                format!("{:.4}", reaction.q_value),
                law
            ]);
        }
        println!("network '{}'", self.name);
        table.printstd();
    }
}

fn resolve_counts(
    reaction: &str,
    list: &[SpeciesCount],
    index: &HashMap<String, usize>,
) -> Result<Vec<(usize, u32)>, NetworkError> {
    let mut resolved: Vec<(usize, u32)> = Vec::with_capacity(list.len());
    for entry in list {
        let i = *index
            .get(&entry.species)
            .ok_or_else(|| NetworkError::UnknownSpecies {
                context: format!("reaction '{}'", reaction),
                species: entry.species.clone(),
            })?;
        if entry.count == 0 {
            return Err(NetworkError::InvalidReaction {
                reaction: reaction.to_string(),
                reason: format!("zero count for species '{}'", entry.species),
            });
        }
        // merge repeated entries ("he4 + he4")
        match resolved.iter_mut().find(|(j, _)| *j == i) {
            Some((_, count)) => *count += entry.count,
            None => resolved.push((i, entry.count)),
        }
    }
    Ok(resolved)
}

fn side_to_string(side: &[(usize, u32)], species: &[Species]) -> String {
    side.iter()
        .map(|&(i, c)| {
            if c == 1 {
                species[i].name.clone()
            } else {
                format!("{} {}", c, species[i].name)
            }
        })
        .collect::<Vec<_>>()
        .join(" + ")
}

fn sorted(side: &[(usize, u32)]) -> Vec<(usize, u32)> {
    let mut side = side.to_vec();
    side.sort_unstable();
    side
}

fn resolve_reaction(
    spec: &ReactionSpec,
    species: &[Species],
    index: &HashMap<String, usize>,
    resolved: &[Reaction],
) -> Result<Reaction, NetworkError> {
    let invalid = |reason: String| NetworkError::InvalidReaction {
        reaction: spec.name.clone(),
        reason,
    };
    if spec.reactants.is_empty() {
        return Err(invalid("no reactants".to_string()));
    }
    let reactants = resolve_counts(&spec.name, &spec.reactants, index)?;
    let products = resolve_counts(&spec.name, &spec.products, index)?;

    let mut change: Vec<f64> = vec![0.0; species.len()];
    for &(i, c) in &reactants {
        change[i] -= c as f64;
    }
    for &(i, c) in &products {
        change[i] += c as f64;
    }
    let imbalance: f64 = change.iter().zip(species).map(|(nu, s)| nu * s.a).sum();
    let scale: f64 = change.iter().zip(species).map(|(nu, s)| (nu * s.a).abs()).sum();
    if imbalance.abs() > 1e-9 * scale.max(1.0) {
        return Err(NetworkError::MassNotConserved {
            reaction: spec.name.clone(),
            imbalance,
        });
    }
    let charge: f64 = change.iter().zip(species).map(|(nu, s)| nu * s.z).sum();
    if charge.abs() > 1e-9 * scale.max(1.0) {
        warn!("reaction '{}' changes the total charge by {}", spec.name, charge);
    }
    let net_change = change
        .iter()
        .enumerate()
        .filter(|(_, nu)| **nu != 0.0)
        .map(|(i, nu)| (i, *nu))
        .collect();

    let (orders, symmetry) = match &spec.orders {
        Some(explicit) => {
            let mut orders = Vec::with_capacity(explicit.len());
            for entry in explicit {
                let i = *index
                    .get(&entry.species)
                    .ok_or_else(|| NetworkError::UnknownSpecies {
                        context: format!("kinetic orders of reaction '{}'", spec.name),
                        species: entry.species.clone(),
                    })?;
                if !(entry.order >= 0.0) || !entry.order.is_finite() {
                    return Err(invalid(format!(
                        "kinetic order of '{}' must be finite and >= 0",
                        entry.species
                    )));
                }
                orders.push((i, entry.order));
            }
            (orders, 1.0)
        }
        None => {
            let orders = reactants.iter().map(|&(i, c)| (i, c as f64)).collect();
            let symmetry = 1.0 / reactants.iter().map(|&(_, c)| factorial(c)).product::<f64>();
            (orders, symmetry)
        }
    };
    let density_exponent = orders.iter().map(|(_, o)| o).sum::<f64>() - 1.0;

    let binding = |side: &[(usize, u32)]| -> f64 {
        side.iter()
            .map(|&(i, c)| c as f64 * species[i].binding_energy)
            .sum()
    };
    let q_value = binding(&products) - binding(&reactants);

    let rate = match (&spec.rate, &spec.reverse_of) {
        (Some(fit), None) => {
            fit.validate().map_err(invalid)?;
            fit.clone()
        }
        (None, Some(forward_name)) => {
            let forward = resolved
                .iter()
                .find(|r| &r.name == forward_name)
                .ok_or_else(|| {
                    invalid(format!(
                        "reverse of unknown or later reaction '{}'",
                        forward_name
                    ))
                })?;
            if sorted(&forward.reactants) != sorted(&products)
                || sorted(&forward.products) != sorted(&reactants)
            {
                return Err(invalid(format!(
                    "is not the reverse of '{}'",
                    forward_name
                )));
            }
            if spec.orders.is_some() || forward_has_explicit_orders(forward) {
                return Err(invalid(
                    "detailed balance needs reactant counts as kinetic orders".to_string(),
                ));
            }
            detailed_balance(forward, species).map_err(invalid)?
        }
        (Some(_), Some(_)) => {
            return Err(invalid("both 'rate' and 'reverse_of' given".to_string()));
        }
        (None, None) => return Err(invalid("no rate given".to_string())),
    };

    Ok(Reaction {
        name: spec.name.clone(),
        group: spec.group,
        equation: format!(
            "{} -> {}",
            side_to_string(&reactants, species),
            side_to_string(&products, species)
        ),
        reactants,
        products,
        orders,
        rate,
        screening: spec.screening.clone(),
        symmetry,
        density_exponent,
        q_value,
        net_change,
    })
}

fn forward_has_explicit_orders(forward: &Reaction) -> bool {
    forward.orders.len() != forward.reactants.len()
        || forward
            .orders
            .iter()
            .zip(&forward.reactants)
            .any(|(&(i, o), &(j, c))| i != j || o != c as f64)
}

/// Reverse rate fit of `forward` from detailed balance.
pub fn detailed_balance(forward: &Reaction, species: &[Species]) -> Result<RateFit, String> {
    let product_over_side = |side: &[(usize, u32)], f: &dyn Fn(&Species) -> f64| -> f64 {
        side.iter()
            .map(|&(i, c)| f(&species[i]).powi(c as i32))
            .product()
    };
    let n_reactants: u32 = forward.reactants.iter().map(|(_, c)| c).sum();
    let n_products: u32 = forward.products.iter().map(|(_, c)| c).sum();
    let spin_ratio = product_over_side(&forward.reactants, &|s: &Species| s.spin_weight)
        / product_over_side(&forward.products, &|s: &Species| s.spin_weight);
    let mass_ratio = product_over_side(&forward.reactants, &|s: &Species| s.a)
        / product_over_side(&forward.products, &|s: &Species| s.a);
    let identical = forward.products.iter().map(|&(_, c)| factorial(c)).product::<f64>()
        / forward.reactants.iter().map(|&(_, c)| factorial(c)).product::<f64>();
    let (prefactor, t9_power) =
        detailed_balance_factors(n_reactants, n_products, spin_ratio, mass_ratio, identical);
    forward.rate.reverse(forward.q_value, prefactor, t9_power)
}

/// Clip negative mass fractions to zero and rescale them to sum to one.
/// Returns the sum before rescaling; a non-positive sum leaves `xn` clipped but unscaled.
/// Entries above one are scaled down with the rest, so [1.5, 0.5] becomes [0.75, 0.25].
pub fn normalize_mass_fractions(xn: &mut [f64]) -> f64 {
    for x in xn.iter_mut() {
        *x = x.max(0.0);
    }
    let sum = kahan_sum(xn);
    if sum > 0.0 {
        for x in xn.iter_mut() {
            *x /= sum;
        }
    }
    sum
}
