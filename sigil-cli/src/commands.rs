//! Command-line surface and the handlers behind each subcommand.
//!
//! Every handler returns a JSON [`Value`]; `main` pretty-prints it.

use std::io::Read;
use std::path::{Path, PathBuf};

use alloy_primitives::{Address, U256};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use sigil::TypedData;
use sigil_safe::{SafePayload, SafeTypedDataFactory, SignatureBlob, SignerCount};

use crate::config::SigilConfig;
use crate::error::CliError;

/// EIP-712 digests for Safe multisig and signature blob inspection.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute the EIP-712 digest of a typed-data JSON document.
    Digest(DigestArgs),
    /// Compute the digest a Safe's owners sign for a transaction or message.
    SafeHash(SafeHashArgs),
    /// Parse and validate a concatenated Safe signature blob.
    Signatures(SignaturesArgs),
}

/// Arguments of `sigil digest`.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Typed-data JSON file, or `-` for stdin.
    pub file: PathBuf,

    /// Also print `encodeType` of the primary type.
    #[arg(long)]
    pub encode_type: bool,
}

/// Arguments of `sigil safe-hash`.
#[derive(Args, Debug)]
pub struct SafeHashArgs {
    /// Safe contract address.
    #[arg(long, env = "SIGIL_SAFE")]
    pub safe: Address,

    /// Safe contract version, e.g. `1.3.0`.
    #[arg(long, env = "SIGIL_SAFE_VERSION")]
    pub safe_version: String,

    /// Chain id; falls back to `default_chain_id` from the configuration.
    #[arg(long, env = "SIGIL_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Payload JSON file, or `-` for stdin. An object with a `to` member is a
    /// transaction, a string is a text message, and anything else is nested
    /// typed data.
    pub payload: PathBuf,
}

/// Arguments of `sigil signatures`.
#[derive(Args, Debug)]
pub struct SignaturesArgs {
    /// `0x`-prefixed signature blob.
    pub hex: String,

    /// Number of signer slots; inferred from the dynamic offsets if omitted.
    #[arg(long)]
    pub signers: Option<usize>,

    /// Recursively validate contract signature payloads as nested blobs.
    #[arg(long)]
    pub nested: bool,
}

/// Runs one subcommand.
///
/// # Errors
///
/// Returns [`CliError`] if an input cannot be read or is invalid.
pub fn run(command: &Command, config: &SigilConfig) -> Result<Value, CliError> {
    match command {
        Command::Digest(args) => {
            let input = read_input(&args.file)?;
            digest(&input, args.encode_type, config)
        }
        Command::SafeHash(args) => {
            let input = read_input(&args.payload)?;
            safe_hash(args, &input, config)
        }
        Command::Signatures(args) => signatures(args, config),
    }
}

/// Digest of a typed-data document.
///
/// # Errors
///
/// Returns [`CliError`] if `input` is not valid typed data.
pub fn digest(input: &str, encode_type: bool, config: &SigilConfig) -> Result<Value, CliError> {
    let typed = TypedData::from_json_str(input)?;
    let digest = typed.eip712_digest(config.hashing_limits())?;
    tracing::debug!(digest = %digest.digest, "computed typed-data digest");

    let mut out = serde_json::to_value(digest)?;
    if let Value::Object(map) = &mut out {
        map.insert("primaryType".into(), typed.primary_type()?.into());
        if encode_type {
            map.insert("encodeType".into(), typed.encode_type()?.into());
        }
    }
    Ok(out)
}

/// Digest a Safe signs for a payload.
///
/// # Errors
///
/// Returns [`CliError::MissingChainId`] if no chain id is known, or another
/// [`CliError`] for an invalid version or payload.
pub fn safe_hash(args: &SafeHashArgs, input: &str, config: &SigilConfig) -> Result<Value, CliError> {
    let chain_id = args
        .chain_id
        .or(config.default_chain_id)
        .ok_or(CliError::MissingChainId)?;
    let factory = SafeTypedDataFactory::new(args.safe, &args.safe_version, U256::from(chain_id))?
        .with_limits(config.hashing_limits());

    let payload = SafePayload::from_json(serde_json::from_str(input)?)?;
    let typed = factory.typed_data(&payload)?;
    let digest = typed.eip712_digest(config.hashing_limits())?;
    tracing::debug!(safe = %args.safe, version = %factory.version(), "computed safe digest");

    Ok(json!({
        "safe": args.safe,
        "safeVersion": factory.version().to_string(),
        "chainId": chain_id,
        "primaryType": typed.primary_type()?,
        "domainSeparator": digest.domain_separator,
        "structHash": digest.struct_hash,
        "digest": digest.digest,
    }))
}

/// Structural report of a signature blob.
///
/// # Errors
///
/// Returns [`CliError::Signature`] for a malformed blob.
pub fn signatures(args: &SignaturesArgs, config: &SigilConfig) -> Result<Value, CliError> {
    let count = args.signers.map_or(SignerCount::Inferred, SignerCount::Exact);
    let blob = SignatureBlob::parse(&args.hex, count)?;
    if args.nested {
        blob.validate_nested(config.max_signature_nesting)?;
    }
    tracing::debug!(signers = blob.len(), "parsed signature blob");

    let mut out = serde_json::to_value(&blob)?;
    if let Value::Object(map) = &mut out {
        map.insert("dynamicLen".into(), blob.dynamic_part().len().into());
    }
    Ok(out)
}

fn read_input(path: &Path) -> Result<String, CliError> {
    let read_error = |source| CliError::Read {
        path: path.to_owned(),
        source,
    };
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .map_err(read_error)?;
        Ok(input)
    } else {
        std::fs::read_to_string(path).map_err(read_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;
    use clap::CommandFactory;
    use sigil_safe::{SafeTransactionData, SignatureBlobError, safe_tx_hash};

    const MAIL: &str = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xcccccccccccccccccccccccccccccccccccccccc"
        },
        "message": {
            "from": {"name": "Cow", "wallet": "0xcd2a3d9f938e13cd947ec05abc7fe734df8dd826"},
            "to": {"name": "Bob", "wallet": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"},
            "contents": "Hello, Bob!"
        }
    }"#;

    fn safe_args(chain_id: Option<u64>) -> SafeHashArgs {
        SafeHashArgs {
            safe: Address::repeat_byte(0x5a),
            safe_version: "1.3.0".into(),
            chain_id,
            payload: PathBuf::from("-"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_signatures_command() {
        let cli = Cli::try_parse_from(["sigil", "signatures", "0x00", "--signers", "2", "--nested"])
            .unwrap();
        match cli.command {
            Command::Signatures(args) => {
                assert_eq!(args.hex, "0x00");
                assert_eq!(args.signers, Some(2));
                assert!(args.nested);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_safe_address() {
        let result = Cli::try_parse_from([
            "sigil",
            "safe-hash",
            "--safe",
            "0x1234",
            "--safe-version",
            "1.3.0",
            "--chain-id",
            "1",
            "tx.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_digest_mail() {
        let out = digest(MAIL, true, &SigilConfig::default()).unwrap();
        assert_eq!(
            out["digest"],
            "0xbe609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
        assert_eq!(
            out["domainSeparator"],
            "0xf2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
        assert_eq!(out["primaryType"], "Mail");
        assert_eq!(
            out["encodeType"],
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_digest_respects_depth_limit() {
        let config = SigilConfig {
            max_type_depth: 0,
            ..SigilConfig::default()
        };
        let err = digest(MAIL, false, &config).unwrap_err();
        assert!(matches!(err, CliError::Eip712(_)));
    }

    #[test]
    fn test_safe_hash_transaction() {
        let tx = SafeTransactionData::call(
            Address::repeat_byte(0x11),
            U256::from(1_000u64),
            Default::default(),
            U256::from(7u64),
        );
        let input = serde_json::to_string(&tx).unwrap();
        let args = safe_args(Some(100));

        let out = safe_hash(&args, &input, &SigilConfig::default()).unwrap();
        let expected = safe_tx_hash(args.safe, "1.3.0", U256::from(100u64), &tx).unwrap();
        assert_eq!(out["digest"], json!(expected));
        assert_eq!(out["primaryType"], "SafeTx");
        assert_eq!(out["chainId"], 100);
    }

    #[test]
    fn test_safe_hash_uses_configured_chain_id() {
        let config = SigilConfig {
            default_chain_id: Some(100),
            ..SigilConfig::default()
        };
        let from_config = safe_hash(&safe_args(None), r#""hello""#, &config).unwrap();
        let explicit = safe_hash(&safe_args(Some(100)), r#""hello""#, &SigilConfig::default())
            .unwrap();
        assert_eq!(from_config["digest"], explicit["digest"]);
        assert_eq!(from_config["primaryType"], "SafeMessage");
    }

    #[test]
    fn test_safe_hash_without_chain_id() {
        let err = safe_hash(&safe_args(None), r#""hello""#, &SigilConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::MissingChainId));
    }

    #[test]
    fn test_safe_hash_rejects_bad_version() {
        let mut args = safe_args(Some(1));
        args.safe_version = "v1.3".into();
        let err = safe_hash(&args, r#""hello""#, &SigilConfig::default()).unwrap_err();
        assert!(matches!(err, CliError::Safe(_)));
    }

    #[test]
    fn test_signatures_report() {
        let mut blob = vec![0u8; 65];
        blob[12..32].copy_from_slice(Address::repeat_byte(0x42).as_slice());
        blob[64] = 1;
        let args = SignaturesArgs {
            hex: format!("0x{}", alloy_primitives::hex::encode(&blob)),
            signers: None,
            nested: true,
        };

        let out = signatures(&args, &SigilConfig::default()).unwrap();
        assert_eq!(out["staticLen"], 65);
        assert_eq!(out["dynamicLen"], 0);
        assert_eq!(out["entries"][0]["type"], "approvedHash");
    }

    #[test]
    fn test_signatures_unknown_type() {
        let mut blob = vec![0u8; 65];
        blob[64] = 5;
        let args = SignaturesArgs {
            hex: format!("0x{}", alloy_primitives::hex::encode(&blob)),
            signers: Some(1),
            nested: false,
        };
        let err = signatures(&args, &SigilConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            CliError::Signature(SignatureBlobError::UnknownSignatureType { index: 0, v: 5 })
        ));
    }

    #[test]
    fn test_digest_vector_constant() {
        let out = digest(MAIL, false, &SigilConfig::default()).unwrap();
        let expected = b256!("c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e");
        assert_eq!(out["structHash"], json!(expected));
        assert!(out.get("encodeType").is_none());
    }
}
