//! Physical constants in CGS units shared by the equations of state and the networks.

/// Avogadro's number (1/mol)
pub const AVOGADRO: f64 = 6.02214076e23;
/// Boltzmann constant (erg/K)
pub const K_BOLTZMANN: f64 = 1.380649e-16;
/// Speed of light (cm/s)
pub const C_LIGHT: f64 = 2.99792458e10;
/// Universal gas constant k_B*N_A (erg/(mol·K)); per gram when divided by the mean molecular weight
pub const GAS_CONSTANT: f64 = K_BOLTZMANN * AVOGADRO;

/// MeV to erg
pub const MEV_TO_ERG: f64 = 1.602176634e-6;
/// MeV/c^2 to gram
pub const MEV_TO_GRAM: f64 = MEV_TO_ERG / (C_LIGHT * C_LIGHT);

/// Neutron mass (g)
pub const M_NEUTRON: f64 = 1.67492721184e-24;
/// Proton mass (g)
pub const M_PROTON: f64 = 1.67262163783e-24;
/// Electron mass (g)
pub const M_ELECTRON: f64 = 9.1093821545e-28;

/// Conversion of the mass-weighted abundance change into specific energy: -N_A*c^2
pub const ENUC_CONVERSION: f64 = -AVOGADRO * C_LIGHT * C_LIGHT;

/// 11.6045 = 1 MeV / (k_B * 1e9 K); Q/(kT) = 11.6045*Q[MeV]/T9
pub const MEV_OVER_K_T9: f64 = 11.604518;
/// (2*pi*m_u*k_B*1e9 K/h^2)^(3/2)/N_A, the translational partition-function factor of detailed balance
pub const DETAILED_BALANCE_CONST: f64 = 9.8685e9;
