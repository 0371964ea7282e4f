use serde::{Deserialize, Serialize};

/// Declares a flat record of string fields with per-field defaults, plus
/// name-based access so rule tables can address fields by their JSON key.
macro_rules! string_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $($field:ident = $default:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            $(pub $field: String,)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: String::from($default),)*
                }
            }
        }

        impl $name {
            pub const FIELDS: &'static [&'static str] = &[$(stringify!($field)),*];

            /// Assign a field by its serialized name. Unknown names are rejected.
            pub fn set(&mut self, key: &str, value: impl Into<String>) -> bool {
                match key {
                    $(stringify!($field) => {
                        self.$field = value.into();
                        true
                    })*
                    _ => false,
                }
            }

            pub fn get(&self, key: &str) -> Option<&str> {
                match key {
                    $(stringify!($field) => Some(self.$field.as_str()),)*
                    _ => None,
                }
            }
        }
    };
}

string_record! {
    /// Crash-level scalars. The s3 keys are filled by whatever persists the
    /// record; extraction always leaves them empty.
    pub struct CrashFields {
        incident_number = "",
        report_number = "",
        department = "",
        state_code = "",
        state_abbreviation = "",
        state_name = "",
        county_code = "",
        county = "",
        municipality_code = "",
        municipality = "",
        crash_location = "",
        crash_type_l1 = "",
        crash_type_l2 = "",
        date_of_crash = "",
        total_killed = "0",
        total_injured = "0",
        total_vehicles = "0",
        case_file_s3_path = "",
        s3_bucket_name = "",
        s3_access_key = "",
        s3_secret_key = "",
        pdf_file_path = "",
    }
}

string_record! {
    pub struct CaseDetail {
        local_information = "",
        locality = "",
        location = "NA",
        route_type = "",
        route_number = "",
        route_prefix = "NA",
        lane_speed_limit_1 = "",
        lane_speed_limit_2 = "",
        crash_severity = "",
    }
}

string_record! {
    pub struct VehicleFields {
        vehicle_unit = "",
        is_commercial = "0",
        make = "",
        model = "",
        vehicle_year = "",
        plate_number = "",
        plate_state = "",
        plate_year = "",
        vin = "",
        policy = "",
        is_driven = "",
        is_left_at_scene = "",
        is_towed = "0",
        is_impounded = "",
        is_disabled = "",
        is_parked = "0",
        is_pedestrian = "",
        is_pedal_cyclist = "",
        is_hit_and_run = "0",
        vehicle_used = "",
        vehicle_type = "",
        trailer_or_carrier_count = "0",
        color = "",
        vehicle_body_type = "",
        vehicle_travel_direction = "",
    }
}

string_record! {
    pub struct VehicleDetails {
        crash_seq_1st_event = "",
        crash_seq_2nd_event = "",
        crash_seq_3rd_event = "",
        crash_seq_4th_event = "",
        harmful_event = "",
        authorized_speed = "",
        estimated_original_speed = "",
        estimated_impact_speed = "",
        tad = "",
        estimated_damage = "",
        most_harmful_event = "",
        insurance_company = "",
        insurance_verified = "0",
        us_dot = "",
        towed_by = "",
        occupant_count = "",
        initial_impact = "",
        contributing_circumstance = "",
        damage_severity = "",
        damaged_area = "",
        vehicle_defects = "",
        overweight_permit = "",
    }
}

string_record! {
    pub struct PersonFields {
        person_type = "NA",
        first_name = "",
        middle_name = "",
        last_name = "",
        same_as_driver = "0",
        seating_position = "",
        date_of_birth = "",
        gender = "",
        alcohol_or_drug_involved = "",
        ethnicity = "",
        occupant = "0",
        airbag_deployed = "",
        airbag_status = "",
        trapped = "",
        ejection = "",
        injury = "",
        ems_name = "",
        injured_taken_by_ems = "",
        age = "",
        injured_taken_to = "",
        driver_info_id = "",
        alcohol_test_status = "",
        alcohol_test_type = "",
        alcohol_test_value = "",
        drug_test_status = "",
        drug_test_type = "",
        drug_test_value = "",
        offense_charged = "",
        local_code = "",
        offense_description = "",
        citation_number = "",
        contact_number = "",
        ol_class = "",
        endorsement = "",
        restriction = "",
        driver_distracted_by = "",
        driving_license = "",
        dl_state = "",
        alcohol_or_drug_suspected = "",
    }
}

string_record! {
    pub struct AddressBlock {
        address_line1 = "",
        address_city = "",
        address_state = "",
        address_zip = "",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(flatten)]
    pub fields: PersonFields,
    pub address_block: AddressBlock,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRecord {
    #[serde(flatten)]
    pub fields: VehicleFields,
    pub vehicle_details: VehicleDetails,
    pub persons: Vec<PersonRecord>,
}

/// The assembled output for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrashRecord {
    #[serde(flatten)]
    pub fields: CrashFields,
    pub case_detail: Vec<CaseDetail>,
    pub vehicles: Vec<VehicleRecord>,
}
