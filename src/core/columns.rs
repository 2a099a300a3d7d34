// Column names of the simulation table. These follow the reference tool's variable
// names so that estimate and reference columns line up by name during validation.

// Weather inputs
pub const GLOB_HOR: &str = "GlobHor";
pub const DIFF_HOR: &str = "DiffHor";
pub const T_AMB: &str = "T_Amb";
pub const WIND_VEL: &str = "WindVel";

// Solar geometry
pub const H_SOL: &str = "HSol";
pub const AZ_SOL: &str = "AzSol";
pub const PHI_ANG: &str = "PhiAng";
pub const ANG_INC: &str = "AngInc";

// Transposition
pub const BEAM_HOR: &str = "BeamHor";
pub const BEAM_INC: &str = "BeamInc";
pub const DIF_S_INC: &str = "DifSInc";
pub const ALB_INC: &str = "Alb_Inc";
pub const GLOB_INC: &str = "GlobInc";

// Near shadings
pub const SHD_B_LSS: &str = "ShdBLss";
pub const SHD_D_LSS: &str = "ShdDLss";
pub const SHD_A_LSS: &str = "ShdALss";
pub const SHD_LOSS: &str = "ShdLoss";
pub const GLOB_SHD: &str = "GlobShd";

// Optical losses
pub const FIAM: &str = "FIAM";
pub const GLOB_IAM: &str = "GlobIAM";
pub const SLG_LOSS: &str = "SlgLoss";
pub const GLOB_SLG: &str = "GlobSlg";
pub const GLOB_EFF: &str = "GlobEff";

// Array
pub const E_ARR_NOM: &str = "EArrNom";
pub const T_ARRAY: &str = "TArray";
pub const OHM_LOSS: &str = "OhmLoss";
pub const MIS_LOSS: &str = "MisLoss";
pub const E_ARR_MPP: &str = "EArrMPP";
pub const E_ARRAY: &str = "EArray";
pub const U_ARRAY: &str = "UArray";
pub const I_ARRAY: &str = "IArray";

// Inverter and grid
pub const E_OUT_INV: &str = "EOutInv";
pub const E_AC_OHM_L: &str = "EACOhmL";
pub const E_MV_TRF_L: &str = "EMVTrfL";
pub const E_MV_OHM_L: &str = "EMVOhmL";
pub const E_GRID: &str = "E_Grid";

// Working columns, removed before the table is delivered
pub const P_MAX_IN: &str = "PMaxIN";
pub const N_NS_VTH: &str = "nNsVth";
pub const RESISTANCE_SERIES: &str = "resistance_series";
pub const PHOTOCURRENT: &str = "photocurrent";
pub const SATURATION_CURRENT: &str = "saturation_current";
pub const RESISTANCE_SHUNT: &str = "resistance_shunt";
pub const VOC_ARRAY: &str = "VocArray";
pub const EFF_INVERTER: &str = "eff_inverter";
pub const F_OHM_LOSS: &str = "FOhmLoss";

pub const WORKING_COLUMNS: [&str; 9] = [
    P_MAX_IN,
    N_NS_VTH,
    RESISTANCE_SERIES,
    PHOTOCURRENT,
    SATURATION_CURRENT,
    RESISTANCE_SHUNT,
    VOC_ARRAY,
    EFF_INVERTER,
    F_OHM_LOSS,
];

// Reference-only column folded into DifSInc before comparison
pub const CIRC_TRP: &str = "CircTrp";
