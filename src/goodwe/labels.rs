use crate::goodwe::codec::Labels;

pub const WORK_MODES_DT: Labels = &[
    (0, "Wait Mode"),
    (1, "Normal"),
    (2, "Error"),
    (4, "Check Mode"),
];

pub const WORK_MODES_ET: Labels = &[
    (0, "Wait Mode"),
    (1, "Normal (On-Grid)"),
    (2, "Normal (Off-Grid)"),
    (3, "Fault Mode"),
    (4, "Flash Mode"),
    (5, "Check Mode"),
];

pub const BATTERY_MODES_ET: Labels = &[
    (0, "No battery"),
    (1, "Standby"),
    (2, "Discharge"),
    (3, "Charge"),
    (4, "To be charged"),
    (5, "To be discharged"),
];

pub const PV_MODES: Labels = &[
    (0, "PV panels not connected"),
    (1, "PV panels connected, no power"),
    (2, "PV panels connected, producing power"),
];

pub const LOAD_MODES: Labels = &[
    (0, "Inverter and the load is disconnected"),
    (1, "The inverter is connected to a load"),
];

pub const WORK_MODES_ES: Labels = &[
    (0, "Inverter Off - Standby"),
    (1, "Inverter On"),
    (2, "Inverter Abnormal, stopping power"),
    (3, "Inverter Severly Abnormal, 20 seconds to restart"),
];

pub const ENERGY_MODES: Labels = &[
    (0, "Check Mode"),
    (1, "Wait Mode"),
    (2, "Normal (On-Grid)"),
    (4, "Normal (Off-Grid)"),
    (8, "Flash Mode"),
    (16, "Fault Mode"),
    (32, "Battery Standby"),
    (64, "Battery Charging"),
    (128, "Battery Discharging"),
];

pub const GRID_MODES: Labels = &[
    (0, "Idle"),
    (1, "Exporting"),
    (2, "Importing"),
];

pub const SAFETY_COUNTRIES: Labels = &[
    (0, "Italy"),
    (1, "Czech"),
    (2, "Germany"),
    (3, "Spain"),
    (4, "Greece"),
    (5, "Denmark"),
    (6, "Belgium"),
    (7, "Romania"),
    (8, "G98"),
    (9, "Australia"),
    (10, "France"),
    (11, "China"),
    (13, "Poland"),
    (14, "South Africa"),
    (15, "AustraliaL"),
    (16, "Brazil"),
    (17, "Thailand MEA"),
    (18, "Thailand PEA"),
    (19, "Mauritius"),
    (20, "Holland"),
    (21, "Northern Ireland"),
    (22, "China Higher"),
    (23, "French 50Hz"),
    (24, "French 60Hz"),
    (25, "Australia Ergon"),
    (26, "Australia Energex"),
    (27, "Holland 16/20A"),
    (28, "Korea"),
    (29, "China Station"),
    (30, "Austria"),
    (31, "India"),
    (32, "50Hz Grid Default"),
    (33, "Warehouse"),
    (34, "Philippines"),
    (35, "Ireland"),
    (36, "Taiwan"),
    (37, "Bulgaria"),
    (38, "Barbados"),
    (39, "China Highest"),
    (40, "G99"),
    (41, "Sweden"),
    (42, "Chile"),
    (43, "Brazil LV"),
    (44, "NewZealand"),
    (45, "IEEE1547 208VAC"),
    (46, "IEEE1547 220VAC"),
    (47, "IEEE1547 240VAC"),
    (48, "60Hz LV Default"),
    (49, "50Hz LV Default"),
    (50, "AU_WAPN"),
    (51, "AU_MicroGrid"),
    (52, "JP_50Hz"),
    (53, "JP_60Hz"),
    (54, "India Higher"),
    (55, "DEWA LV"),
    (56, "DEWA MV"),
    (57, "Slovakia"),
    (58, "GreenGrid"),
    (59, "Hungary"),
    (60, "Sri Lanka"),
    (61, "Spain Islands"),
    (62, "Ergon30K"),
    (63, "Energex30K"),
    (64, "IEEE1547 230/400V"),
    (65, "IEC61727 60Hz"),
    (66, "Switzerland"),
    (67, "CEI-016"),
    (68, "AU_Horizon"),
    (69, "Cyprus"),
    (70, "AU_SAPN"),
    (71, "AU_Ausgrid"),
    (72, "AU_Essential"),
    (73, "AU_Pwcore&CitiPW"),
    (74, "Hong Kong"),
    (75, "Poland MV"),
    (76, "Holland MV"),
    (77, "Sweden MV"),
    (78, "VDE4110"),
    (96, "cUSA_208VacDefault"),
    (97, "cUSA_240VacDefault"),
    (98, "cUSA_208VacCA_SCE"),
    (99, "cUSA_240VacCA_SCE"),
    (100, "cUSA_208VacCA_SDGE"),
    (101, "cUSA_240VacCA_SDGE"),
    (102, "cUSA_208VacCA_PGE"),
    (103, "cUSA_240VacCA_PGE"),
    (104, "cUSA_208VacHECO_14HO"),
    (105, "cUSA_240VacHECO_14HO0x69"),
    (106, "cUSA_208VacHECO_14HM"),
    (107, "cUSA_240VacHECO_14HM"),
];
