// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]
//! Numerical analysis lessons: floating point arithmetic, convergence of sequences
//! and difference quotients, root finding, polynomial interpolation and least squares.
//! Every lesson produces a [`lessons::Report`] of narrative text and tables.
pub mod Utils;
pub mod lessons;
pub mod settings;
