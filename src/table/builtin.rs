//! Builtin rule table
//!
//! Encodes the automatic adjustments applied to legacy crypto
//! configurations: internal helper flags, options that earlier releases
//! enabled implicitly, and capability helpers that hide whether a feature
//! comes from the builtin software or from a PSA driver.

use super::{RuleTable, TableResult, RULE_TABLE_VERSION};
use crate::capability::{Capability, CapabilityRegistry, ProviderPath};
use crate::rules::{Expr, Rule, RuleCategory, RuleSet};
use crate::validator::ConstraintSet;

const USE_PSA_CRYPTO: &str = "MBEDTLS_USE_PSA_CRYPTO";

/// Modules that started depending on MD_LIGHT after they were first released
const MD_LIGHT_LEGACY_USERS: [&str; 9] = [
    "MBEDTLS_ECJPAKE_C",
    "MBEDTLS_PEM_PARSE_C",
    "MBEDTLS_ENTROPY_C",
    "MBEDTLS_PK_C",
    "MBEDTLS_PKCS12_C",
    "MBEDTLS_RSA_C",
    "MBEDTLS_SSL_TLS_C",
    "MBEDTLS_X509_USE_C",
    "MBEDTLS_X509_CREATE_C",
];

pub(super) fn build() -> TableResult<RuleTable> {
    RuleTable::new(
        RULE_TABLE_VERSION,
        rules()?,
        capabilities()?,
        ConstraintSet::new(),
    )
}

fn rules() -> TableResult<RuleSet> {
    let mut set = RuleSet::new();

    // MD_LIGHT
    set.add_rule(
        Rule::new(
            "md_light.md_c",
            Expr::flag("MBEDTLS_MD_C"),
            "MBEDTLS_MD_LIGHT",
            RuleCategory::InternalAlias,
        )
        .with_rationale("MD_C includes MD_LIGHT, so code can test MD_LIGHT alone"),
    )?;
    set.add_rule(
        Rule::new(
            "md_light.legacy_users",
            Expr::any_of(MD_LIGHT_LEGACY_USERS),
            "MBEDTLS_MD_LIGHT",
            RuleCategory::LegacyCompat,
        )
        .with_rationale("module did not require MD_LIGHT in a previous release"),
    )?;

    // ECP_LIGHT
    set.add_rule(
        Rule::new(
            "ecp_light.ecp_c",
            Expr::flag("MBEDTLS_ECP_C"),
            "MBEDTLS_ECP_LIGHT",
            RuleCategory::InternalAlias,
        )
        .with_rationale("ECP_C is ECP_LIGHT plus curve arithmetic"),
    )?;
    set.add_rule(
        Rule::new(
            "ecp_light.pk_parse_ec",
            Expr::any_of([
                "MBEDTLS_PK_PARSE_EC_EXTENDED",
                "MBEDTLS_PK_PARSE_EC_COMPRESSED",
            ]),
            "MBEDTLS_ECP_LIGHT",
            RuleCategory::LegacyCompat,
        )
        .with_rationale("extended and compressed EC parsing are only available from the builtin ECP code"),
    )?;
    set.add_rule(
        Rule::new(
            "ecp_light.key_pair_derive",
            Expr::flag("MBEDTLS_PSA_BUILTIN_KEY_TYPE_ECC_KEY_PAIR_DERIVE"),
            "MBEDTLS_ECP_LIGHT",
            RuleCategory::HardDependency,
        )
        .with_rationale("Weierstrass key derivation still depends on ECP_LIGHT"),
    )?;

    set.add_rule(
        Rule::new(
            "pk_parse_ec_compressed.legacy",
            Expr::all_of(["MBEDTLS_PK_PARSE_C", "MBEDTLS_ECP_C"]),
            "MBEDTLS_PK_PARSE_EC_COMPRESSED",
            RuleCategory::LegacyCompat,
        )
        .with_rationale("compressed points were implied by PK_PARSE_C and ECP_C before 3.5"),
    )?;

    set.add_rule(
        Rule::new(
            "psa_crypto_client.psa_crypto_c",
            Expr::flag("MBEDTLS_PSA_CRYPTO_C"),
            "MBEDTLS_PSA_CRYPTO_CLIENT",
            RuleCategory::InternalAlias,
        )
        .with_rationale("the PSA core needs all PSA client code"),
    )?;

    // PK wrappers format RSA keys with pk_write when dispatching to PSA
    for consequent in ["MBEDTLS_PK_C", "MBEDTLS_PK_WRITE_C", "MBEDTLS_PK_PARSE_C"] {
        let id = format!("{}.psa_rsa", consequent.trim_start_matches("MBEDTLS_").to_ascii_lowercase());
        set.add_rule(
            Rule::new(
                id,
                Expr::all_of(["MBEDTLS_PSA_CRYPTO_C", "MBEDTLS_RSA_C"]),
                consequent,
                RuleCategory::HardDependency,
            )
            .with_rationale("PK wrappers format RSA key objects when dispatching to PSA"),
        )?;
    }

    set.add_rule(
        Rule::new(
            "pk_can_ecdsa_some",
            Expr::any_of(["MBEDTLS_PK_CAN_ECDSA_SIGN", "MBEDTLS_PK_CAN_ECDSA_VERIFY"]),
            "MBEDTLS_PK_CAN_ECDSA_SOME",
            RuleCategory::InternalAlias,
        )
        .with_rationale("PK supports at least one ECDSA operation"),
    )?;

    Ok(set)
}

fn capabilities() -> TableResult<CapabilityRegistry> {
    let mut registry = CapabilityRegistry::new();

    registry.register(
        Capability::new(
            "MBEDTLS_CAN_ECDH",
            vec![
                ProviderPath::driver([USE_PSA_CRYPTO, "PSA_WANT_ALG_ECDH"]),
                ProviderPath::builtin(["MBEDTLS_ECDH_C"]).excluding([USE_PSA_CRYPTO]),
            ],
        )
        .promoted_to("MBEDTLS_CAN_ECDH")
        .with_description("ECDH through the library implementation or through PSA"),
    )?;

    registry.register(
        Capability::new(
            "MBEDTLS_PK_CAN_ECDSA_SIGN",
            vec![
                ProviderPath::builtin(["MBEDTLS_ECDSA_C"]).excluding([USE_PSA_CRYPTO]),
                ProviderPath::driver([
                    USE_PSA_CRYPTO,
                    "PSA_WANT_ALG_ECDSA",
                    "PSA_WANT_KEY_TYPE_ECC_KEY_PAIR_BASIC",
                ]),
            ],
        )
        .promoted_to("MBEDTLS_PK_CAN_ECDSA_SIGN")
        .with_description("PK can produce ECDSA signatures"),
    )?;

    registry.register(
        Capability::new(
            "MBEDTLS_PK_CAN_ECDSA_VERIFY",
            vec![
                ProviderPath::builtin(["MBEDTLS_ECDSA_C"]).excluding([USE_PSA_CRYPTO]),
                ProviderPath::driver([
                    USE_PSA_CRYPTO,
                    "PSA_WANT_ALG_ECDSA",
                    "PSA_WANT_KEY_TYPE_ECC_PUBLIC_KEY",
                ]),
            ],
        )
        .promoted_to("MBEDTLS_PK_CAN_ECDSA_VERIFY")
        .with_description("PK can verify ECDSA signatures"),
    )?;

    registry.register(
        Capability::new(
            "MBEDTLS_PK_HAVE_ECC_KEYS",
            vec![
                ProviderPath::builtin(["MBEDTLS_ECP_C"]),
                ProviderPath::driver([USE_PSA_CRYPTO, "PSA_WANT_KEY_TYPE_ECC_PUBLIC_KEY"]),
            ],
        )
        .promoted_to("MBEDTLS_PK_HAVE_ECC_KEYS")
        .with_description("PK supports EC keys through legacy ECP or PSA EC data"),
    )?;

    Ok(registry)
}
