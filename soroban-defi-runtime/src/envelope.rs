//! Transaction envelope assembly: folds a simulation back into the envelope
//! that was simulated so it can be signed and submitted as-is.

use stellar_xdr::curr::{
    Limits, OperationBody, ReadXdr, SorobanAuthorizationEntry, SorobanTransactionData,
    TransactionEnvelope, TransactionExt, WriteXdr,
};
use tracing::debug;

use crate::error::{DefiError, Result, TransactionErrorCode};
use crate::rpc::SimulationResult;

fn codec_error(what: &str, e: stellar_xdr::curr::Error) -> DefiError {
    DefiError::transaction(TransactionErrorCode::Serialization, format!("{what}: {e}")).with_source(e)
}

fn assembly_error(message: impl Into<String>) -> DefiError {
    DefiError::transaction(TransactionErrorCode::AssemblyFailed, message)
}

/// Apply `simulation` to the base64 envelope `xdr`:
///
/// - the footprint and resources become the transaction's Soroban data,
/// - the fee becomes the inclusion fee plus the minimum resource fee,
/// - an invocation without authorization entries takes the simulated ones.
///
/// Returns the re-encoded envelope.
pub fn assemble(xdr: &str, simulation: &SimulationResult) -> Result<String> {
    let mut envelope = TransactionEnvelope::from_xdr_base64(xdr, Limits::none())
        .map_err(|e| codec_error("Invalid transaction envelope", e))?;
    let TransactionEnvelope::Tx(v1) = &mut envelope else {
        return Err(assembly_error("Only v1 transaction envelopes can be assembled"));
    };
    let tx = &mut v1.tx;

    let data = simulation
        .transaction_data
        .as_deref()
        .ok_or_else(|| assembly_error("Simulation returned no transaction data"))?;
    let data = SorobanTransactionData::from_xdr_base64(data, Limits::none())
        .map_err(|e| codec_error("Invalid simulated transaction data", e))?;
    let resource_fee = simulation
        .min_resource_fee()
        .ok_or_else(|| assembly_error("Simulation returned no resource fee"))?;

    // A previously assembled envelope already carries a resource fee.
    let inclusion_fee = match &tx.ext {
        TransactionExt::V1(existing) => {
            u64::from(tx.fee).saturating_sub(u64::try_from(existing.resource_fee).unwrap_or(0))
        }
        TransactionExt::V0 => u64::from(tx.fee),
    };
    tx.fee = inclusion_fee
        .checked_add(resource_fee)
        .and_then(|fee| u32::try_from(fee).ok())
        .ok_or_else(|| assembly_error(format!("Fee {inclusion_fee} + {resource_fee} overflows")))?;
    tx.ext = TransactionExt::V1(data);

    let simulated_auth = simulation
        .results
        .first()
        .map(|r| r.auth.as_slice())
        .unwrap_or_default();
    if !simulated_auth.is_empty() {
        let mut operations = tx.operations.to_vec();
        if let Some(OperationBody::InvokeHostFunction(op)) = operations.first_mut().map(|o| &mut o.body) {
            if op.auth.is_empty() {
                let entries = simulated_auth
                    .iter()
                    .map(|a| SorobanAuthorizationEntry::from_xdr_base64(a, Limits::none()))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| codec_error("Invalid simulated authorization entry", e))?;
                op.auth = entries
                    .try_into()
                    .map_err(|e| codec_error("Too many authorization entries", e))?;
            }
        }
        tx.operations = operations
            .try_into()
            .map_err(|e| codec_error("Too many operations", e))?;
    }

    debug!(fee = tx.fee, resource_fee, "envelope assembled");
    envelope
        .to_xdr_base64(Limits::none())
        .map_err(|e| codec_error("Failed to encode assembled envelope", e))
}

/// Envelope builders for tests that need real XDR.
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use stellar_xdr::curr::{
        ExtensionPoint, Hash, HostFunction, InvokeContractArgs, InvokeHostFunctionOp,
        LedgerFootprint, Limits, Memo, MuxedAccount, Operation, OperationBody, Preconditions,
        ScAddress, ScSymbol, SequenceNumber, SorobanAuthorizationEntry, SorobanAuthorizedFunction,
        SorobanAuthorizedInvocation, SorobanCredentials, SorobanResources, SorobanTransactionData,
        StringM, Transaction, TransactionEnvelope, TransactionExt, TransactionV1Envelope, Uint256,
        VecM, WriteXdr,
    };

    /// Inclusion fee of [`unsigned_swap_envelope`], in stroops.
    pub const INCLUSION_FEE: u32 = 100;

    fn swap_call() -> InvokeContractArgs {
        InvokeContractArgs {
            contract_address: ScAddress::Contract(Hash([9; 32])),
            function_name: ScSymbol(StringM::try_from("swap_exact_tokens_for_tokens").expect("symbol")),
            args: VecM::default(),
        }
    }

    /// Unsigned, unassembled router invocation as base64.
    pub fn unsigned_swap_envelope() -> String {
        let op = Operation {
            source_account: None,
            body: OperationBody::InvokeHostFunction(InvokeHostFunctionOp {
                host_function: HostFunction::InvokeContract(swap_call()),
                auth: VecM::default(),
            }),
        };
        let tx = Transaction {
            source_account: MuxedAccount::Ed25519(Uint256([7; 32])),
            fee: INCLUSION_FEE,
            seq_num: SequenceNumber(1),
            cond: Preconditions::None,
            memo: Memo::None,
            operations: vec![op].try_into().expect("one operation"),
            ext: TransactionExt::V0,
        };
        TransactionEnvelope::Tx(TransactionV1Envelope {
            tx,
            signatures: VecM::default(),
        })
        .to_xdr_base64(Limits::none())
        .expect("encode envelope")
    }

    /// Soroban data as returned in `simulateTransaction.transactionData`.
    pub fn transaction_data(resource_fee: i64) -> String {
        SorobanTransactionData {
            ext: ExtensionPoint::V0,
            resources: SorobanResources {
                footprint: LedgerFootprint {
                    read_only: VecM::default(),
                    read_write: VecM::default(),
                },
                instructions: 4_000_000,
                read_bytes: 2_048,
                write_bytes: 512,
            },
            resource_fee,
        }
        .to_xdr_base64(Limits::none())
        .expect("encode transaction data")
    }

    /// Source-account authorization for the swap call.
    pub fn auth_entry() -> String {
        SorobanAuthorizationEntry {
            credentials: SorobanCredentials::SourceAccount,
            root_invocation: SorobanAuthorizedInvocation {
                function: SorobanAuthorizedFunction::ContractFn(swap_call()),
                sub_invocations: VecM::default(),
            },
        }
        .to_xdr_base64(Limits::none())
        .expect("encode auth entry")
    }
}
