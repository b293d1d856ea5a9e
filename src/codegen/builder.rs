//! Quantized layers to a [`MoveModule`].

use crate::quantize::QuantizedLayer;

use super::ir::{Expr, Function, MoveModule, Param, Stmt, Type, Visibility};

pub const MODULE_ADDRESS: &str = "models";
pub const MODULE_NAME: &str = "model";

const GRAPH: &str = "graph::SignedFixedGraph";
const PARTIALS: &str = "graph::PartialDenses";
const TX_CONTEXT: &str = "TxContext";

/// The three-value result every evaluation entry point returns:
/// output magnitudes, output signs, output length.
const RESULT_NAMES: [&str; 3] = ["results_mag", "result_sign", "results"];

/// Build the graph module for already-validated layers.
pub fn build_module(layers: &[QuantizedLayer], scale: u32) -> MoveModule {
    let chunked_layers = match layers.split_last() {
        Some((_, head)) => head.iter().map(|l| l.name.clone()).collect(),
        None => Vec::new(),
    };
    MoveModule {
        address: MODULE_ADDRESS.to_string(),
        name: MODULE_NAME.to_string(),
        uses: vec![
            "sui::tx_context::TxContext".to_string(),
            "tensorflowsui::graph".to_string(),
            "tensorflowsui::tensor".to_string(),
        ],
        functions: vec![
            create_model(layers),
            split_chunk_compute(),
            split_chunk_finalize(),
            ptb_layer(),
            ptb_layer_arg_max(),
            initialize(scale),
        ],
        chunked_layers,
    }
}

/// `create_model_signed_fixed`: declares every dense layer, then attaches
/// each layer's weights.
fn create_model(layers: &[QuantizedLayer]) -> Function {
    let declarations = layers
        .iter()
        .map(|l| {
            Stmt::Expr(Expr::call(
                "graph::DenseSignedFixed",
                vec![
                    Expr::var("graph"),
                    Expr::U64(l.input_size() as u64),
                    Expr::U64(l.output_size() as u64),
                    Expr::ByteString(l.name.clone()),
                    Expr::var("scale"),
                ],
            ))
        })
        .collect();

    let mut blocks = vec![declarations];
    blocks.extend(layers.iter().map(weight_block));

    Function {
        visibility: Visibility::Public,
        name: "create_model_signed_fixed".to_string(),
        params: vec![
            Param::new("graph", Type::named(GRAPH).by_mut_ref()),
            Param::new("scale", Type::U64),
        ],
        returns: Vec::new(),
        blocks,
        tail: None,
    }
}

/// Weight constants for one layer plus the call that attaches them.
fn weight_block(layer: &QuantizedLayer) -> Vec<Stmt> {
    let name = &layer.name;
    let w_mag = format!("w{}_mag", name);
    let w_sign = format!("w{}_sign", name);
    let b_mag = format!("b{}_mag", name);
    let b_sign = format!("b{}_sign", name);
    let widen = |signs: &[u8]| signs.iter().map(|&s| u64::from(s)).collect::<Vec<_>>();

    vec![
        let_one(&w_mag, Expr::Vector(layer.kernel.magnitudes.clone())),
        let_one(&w_sign, Expr::Vector(widen(&layer.kernel.signs))),
        let_one(&b_mag, Expr::Vector(layer.bias.magnitudes.clone())),
        let_one(&b_sign, Expr::Vector(widen(&layer.bias.signs))),
        Stmt::Expr(Expr::call(
            "graph::set_layer_weights_signed_fixed",
            vec![
                Expr::var("graph"),
                Expr::ByteString(name.clone()),
                Expr::var(&w_mag),
                Expr::var(&w_sign),
                Expr::var(&b_mag),
                Expr::var(&b_sign),
                Expr::U64(layer.kernel_shape.0 as u64),
                Expr::U64(layer.kernel_shape.1 as u64),
                Expr::var("scale"),
            ],
        )),
    ]
}

fn let_one(name: &str, value: Expr) -> Stmt {
    Stmt::Let {
        names: vec![name.to_string()],
        mutable: false,
        value,
    }
}

fn input_params() -> Vec<Param> {
    vec![
        Param::new("input_magnitude", Type::U64Vector),
        Param::new("input_sign", Type::U64Vector),
    ]
}

fn result_types() -> Vec<Type> {
    vec![Type::U64Vector, Type::U64Vector, Type::U64]
}

/// `let (results_mag, result_sign, results) = <call>;` then return the tuple.
fn forward_results(call: Expr) -> (Vec<Vec<Stmt>>, Option<Expr>) {
    let bind = Stmt::Let {
        names: RESULT_NAMES.iter().map(|n| n.to_string()).collect(),
        mutable: false,
        value: call,
    };
    (vec![vec![bind]], Some(Expr::Tuple(Expr::vars(&RESULT_NAMES))))
}

/// Compute one sub-range `[start_j, end_j)` of a layer's outputs into the
/// shared partial state.
fn split_chunk_compute() -> Function {
    let mut params = vec![
        Param::new("graph_obj", Type::named(GRAPH).by_ref()),
        Param::new("pd", Type::named(PARTIALS).by_mut_ref()),
        Param::new("partial_name", Type::Bytes),
    ];
    params.extend(input_params());
    params.extend([
        Param::new("activation_type", Type::U64),
        Param::new("start_j", Type::U64),
        Param::new("end_j", Type::U64),
    ]);
    let args = Expr::vars(&[
        "graph_obj",
        "pd",
        "partial_name",
        "input_magnitude",
        "input_sign",
        "activation_type",
        "start_j",
        "end_j",
    ]);
    Function {
        visibility: Visibility::EntryPublic,
        name: "split_chunk_compute".to_string(),
        params,
        returns: Vec::new(),
        blocks: vec![vec![Stmt::Expr(Expr::call("graph::split_chunk_compute", args))]],
        tail: None,
    }
}

/// Combine the computed sub-ranges of a layer into its output.
fn split_chunk_finalize() -> Function {
    let (blocks, tail) = forward_results(Expr::call(
        "graph::split_chunk_finalize",
        Expr::vars(&["pd", "partial_name"]),
    ));
    Function {
        visibility: Visibility::EntryPublic,
        name: "split_chunk_finalize".to_string(),
        params: vec![
            Param::new("pd", Type::named(PARTIALS).by_mut_ref()),
            Param::new("partial_name", Type::Bytes),
        ],
        returns: result_types(),
        blocks,
        tail,
    }
}

fn layer_eval_params() -> Vec<Param> {
    let mut params = vec![Param::new("graph", Type::named(GRAPH).by_ref())];
    params.extend(input_params());
    params.push(Param::new("scale", Type::U64));
    params.push(Param::new("name", Type::Bytes));
    params
}

fn layer_eval_args() -> Vec<Expr> {
    Expr::vars(&["graph", "input_magnitude", "input_sign", "scale", "name"])
}

/// Evaluate one layer in a single invocation.
fn ptb_layer() -> Function {
    let (blocks, tail) = forward_results(Expr::call("graph::ptb_layer", layer_eval_args()));
    Function {
        visibility: Visibility::EntryPublic,
        name: "ptb_layer".to_string(),
        params: layer_eval_params(),
        returns: result_types(),
        blocks,
        tail,
    }
}

/// Evaluate one layer and return only the index of its largest output.
fn ptb_layer_arg_max() -> Function {
    Function {
        visibility: Visibility::EntryPublic,
        name: "ptb_layer_arg_max".to_string(),
        params: layer_eval_params(),
        returns: vec![Type::U64],
        blocks: Vec::new(),
        tail: Some(Expr::call("graph::ptb_layer_arg_max", layer_eval_args())),
    }
}

/// Build the graph once, load the weights, create chunked state for all
/// layers but the last, and share both objects.
fn initialize(scale: u32) -> Function {
    let body = vec![
        Stmt::Let {
            names: vec!["graph".to_string()],
            mutable: true,
            value: Expr::call("graph::create_signed_graph", vec![Expr::var("ctx")]),
        },
        Stmt::Expr(Expr::call(
            "create_model_signed_fixed",
            vec![Expr::borrow_mut("graph"), Expr::U64(u64::from(scale))],
        )),
        Stmt::Let {
            names: vec!["partials".to_string()],
            mutable: true,
            value: Expr::call("graph::create_partial_denses", vec![Expr::var("ctx")]),
        },
        Stmt::Expr(Expr::call(
            "graph::add_partials_for_all_but_last",
            vec![Expr::borrow("graph"), Expr::borrow_mut("partials")],
        )),
        Stmt::Expr(Expr::call("graph::share_graph", vec![Expr::var("graph")])),
        Stmt::Expr(Expr::call("graph::share_partial", vec![Expr::var("partials")])),
    ];
    Function {
        visibility: Visibility::PublicEntry,
        name: "initialize".to_string(),
        params: vec![Param::new("ctx", Type::named(TX_CONTEXT).by_mut_ref())],
        returns: Vec::new(),
        blocks: vec![body],
        tail: None,
    }
}
